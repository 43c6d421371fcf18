//! Listening socket construction.
//!
//! `tokio::net::TcpListener::bind` does not let us pick the backlog, and the
//! status port must come back immediately after a restart even while old
//! connections linger in `TIME_WAIT`.  The socket is therefore built with
//! `socket2` (reuse address, non-blocking, backlog 5) and only then handed to
//! tokio.

use std::net::{SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::TcpListener;

/// Connection backlog of the listening socket.
///
/// Bursts beyond this are refused by the kernel, not by the server.
pub const LISTEN_BACKLOG: i32 = 5;

/// Error type for listener startup.  All variants are fatal.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not create socket: {0}")]
    Socket(#[source] std::io::Error),

    #[error("could not set socket option on {addr}: {source}")]
    SocketOption {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    #[error("could not bind socket to {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },

    #[error("could not listen on {addr}: {source}")]
    Listen {
        addr: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },
}

/// Creates the listening socket for `addr`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns [`ServerError`] if any step of socket creation, configuration,
/// binding or listening fails, e.g. when the port is already in use.
pub fn bind_listener(addr: SocketAddrV4) -> Result<TcpListener, ServerError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(ServerError::Socket)?;

    let option_err = |source| ServerError::SocketOption { addr, source };
    socket.set_reuse_address(true).map_err(option_err)?;
    socket.set_nonblocking(true).map_err(option_err)?;

    socket
        .bind(&SocketAddr::V4(addr).into())
        .map_err(|source| ServerError::Bind { addr, source })?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|source| ServerError::Listen { addr, source })?;

    TcpListener::from_std(socket.into()).map_err(|source| ServerError::Listen { addr, source })
}
