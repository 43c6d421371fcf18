//! The accept loop.
//!
//! A single task multiplexes three event sources:
//!
//! - the supervisor watch, which ends the process with [`LoopExit::SupervisorLost`];
//! - the shutdown wakeup, after which the flag is re-checked;
//! - the listening socket, whose connections are handled one at a time.
//!
//! `select!` is `biased` so that a lost supervisor always wins over a pending
//! connection, and a pending shutdown wins over accepting more work.  Each
//! connection is awaited inline; no second accept happens until the previous
//! connection has been closed.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::application::{ConnectionHandler, ReplicationSource};
use crate::domain::ServerConfig;
use crate::infrastructure::listener::{bind_listener, ServerError};
use crate::infrastructure::shutdown::Shutdown;
use crate::infrastructure::supervisor::SupervisorWatch;

/// Why [`EventLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A shutdown was requested; the listener has been closed.
    Shutdown,
    /// The supervising process disappeared.
    SupervisorLost,
}

impl LoopExit {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Shutdown => 0,
            Self::SupervisorLost => 1,
        }
    }
}

/// Owns the listening socket and dispatches accepted connections.
pub struct EventLoop<S, W> {
    listener: TcpListener,
    handler: ConnectionHandler<S>,
    shutdown: Arc<Shutdown>,
    supervisor: W,
}

impl<S, W> EventLoop<S, W>
where
    S: ReplicationSource,
    W: SupervisorWatch,
{
    /// Binds the configured address.  All fallible startup happens here.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the listening socket cannot be created.
    pub fn bind(
        config: &ServerConfig,
        source: S,
        supervisor: W,
        shutdown: Arc<Shutdown>,
    ) -> Result<Self, ServerError> {
        let listener = bind_listener(config.socket_addr())?;
        Ok(Self::from_listener(
            listener,
            ConnectionHandler::new(source),
            supervisor,
            shutdown,
        ))
    }

    /// Wraps an already-bound listener.
    pub fn from_listener(
        listener: TcpListener,
        handler: ConnectionHandler<S>,
        supervisor: W,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            listener,
            handler,
            shutdown,
            supervisor,
        }
    }

    /// The address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Propagates the error from `getsockname`.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until shutdown or supervisor loss.
    ///
    /// Per-connection and accept failures are logged and the loop continues.
    pub async fn run(mut self) -> LoopExit {
        match self.listener.local_addr() {
            Ok(addr) => info!("accepting status queries on {addr}"),
            Err(e) => warn!("listening, but could not read local address: {e}"),
        }

        while !self.shutdown.is_requested() {
            tokio::select! {
                biased;

                () = self.supervisor.lost() => {
                    error!("supervising process is gone, exiting");
                    return LoopExit::SupervisorLost;
                }
                () = self.shutdown.notified() => {}
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.handler.handle(stream, &peer.to_string()).await;
                    }
                    Err(e) => warn!("could not accept connection: {e}"),
                },
            }
        }

        drop(self.listener);
        info!("received shutdown request, listener closed");
        LoopExit::Shutdown
    }
}
