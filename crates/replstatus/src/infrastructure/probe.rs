//! Client side of the status protocol.
//!
//! Used by `replstatus probe` (a drop-in external check for load balancers)
//! and by the integration tests.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use replstatus_core::{Status, TokenError};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Upper bound on a whole query.  The server answers within the threshold
/// wait plus one file read, so this only trips on a wedged peer.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest reply the probe accepts.
const MAX_REPLY_LEN: u64 = 64;

/// Error type for status queries.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("could not send delay threshold to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read reply from {addr}: {source}")]
    Receive {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no reply from {addr} within {:?}", PROBE_TIMEOUT)]
    TimedOut { addr: SocketAddr },

    #[error("unexpected reply from {addr}: {source}")]
    Reply {
        addr: SocketAddr,
        #[source]
        source: TokenError,
    },
}

/// Connects to `addr`, optionally sends `threshold`, and decodes the reply.
///
/// The threshold is written immediately after connecting, in decimal with no
/// terminator, so it arrives well inside the server's wait window.
///
/// # Errors
///
/// Returns [`ProbeError`] if the exchange fails or the reply is not a status
/// token.
pub async fn query_status(addr: SocketAddr, threshold: Option<i32>) -> Result<Status, ProbeError> {
    timeout(PROBE_TIMEOUT, exchange(addr, threshold))
        .await
        .map_err(|_| ProbeError::TimedOut { addr })?
}

async fn exchange(addr: SocketAddr, threshold: Option<i32>) -> Result<Status, ProbeError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ProbeError::Connect { addr, source })?;

    if let Some(threshold) = threshold {
        stream
            .write_all(threshold.to_string().as_bytes())
            .await
            .map_err(|source| ProbeError::Send { addr, source })?;
    }

    let mut reply = Vec::with_capacity(8);
    let mut limited = (&mut stream).take(MAX_REPLY_LEN);
    loop {
        let mut chunk = [0u8; 16];
        match limited.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => reply.extend_from_slice(&chunk[..n]),
            // A server that closes with our unread threshold still queued
            // resets the connection; the token has already arrived by then.
            Err(e) if e.kind() == ErrorKind::ConnectionReset && !reply.is_empty() => break,
            Err(source) => return Err(ProbeError::Receive { addr, source }),
        }
    }

    Status::from_token(&reply).map_err(|source| ProbeError::Reply { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn one_shot_server(reply: &'static [u8]) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            conn.write_all(reply).await.unwrap();
            conn.shutdown().await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_decodes_reply() {
        let addr = one_shot_server(b"STANDBY").await;
        assert_eq!(query_status(addr, None).await.unwrap(), Status::Standby);
    }

    #[tokio::test]
    async fn test_sends_threshold_in_decimal() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 16];
            let n = conn.read(&mut buf).await.unwrap();
            conn.write_all(b"OFFLINE").await.unwrap();
            buf[..n].to_vec()
        });

        // Act
        let status = query_status(addr, Some(15)).await.unwrap();

        // Assert
        assert_eq!(status, Status::Offline);
        assert_eq!(server.await.unwrap(), b"15");
    }

    #[tokio::test]
    async fn test_garbage_reply_is_error() {
        let addr = one_shot_server(b"HELLO").await;
        let result = query_status(addr, None).await;
        assert!(matches!(
            result,
            Err(ProbeError::Reply {
                source: TokenError::Unknown(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_error() {
        // Arrange: grab a free port, then release it
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        // Act / Assert
        assert!(matches!(
            query_status(addr, None).await,
            Err(ProbeError::Connect { .. })
        ));
    }
}
