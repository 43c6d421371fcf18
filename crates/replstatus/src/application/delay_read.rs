//! Optional delay-threshold read on an accepted connection.
//!
//! The server reads *before* it writes: a client that wants delay-aware
//! classification must send its threshold right after connecting.  A client
//! that sends nothing costs the server at most the bounded wait, after which
//! the permissive default applies.
//!
//! Every failure here (timeout, I/O error, garbage) collapses to `None`.  None
//! of them fails the connection.

use std::time::Duration;

use replstatus_core::protocol::THRESHOLD_BUFFER_LEN;
use replstatus_core::parse_threshold;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Waits up to `wait` for the client to send a delay threshold.
///
/// Performs a single read of at most [`THRESHOLD_BUFFER_LEN`] bytes and parses
/// the leading decimal integer.  Returns `None` when nothing arrives in time,
/// the peer closes, the read fails, or the bytes are not a valid `i32`.
pub async fn read_threshold<R>(conn: &mut R, wait: Duration) -> Option<i32>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; THRESHOLD_BUFFER_LEN];

    let read = match timeout(wait, conn.read(&mut buf)).await {
        Ok(Ok(0)) => {
            debug!("client closed without sending a delay threshold");
            return None;
        }
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            warn!("could not read delay threshold: {e}");
            return None;
        }
        Err(_) => {
            // Expected for plain status checks.
            return None;
        }
    };

    match parse_threshold(&buf[..read]) {
        Ok(threshold) => {
            debug!("client delay threshold: {threshold}s");
            Some(threshold)
        }
        Err(e) => {
            warn!("ignoring {e}");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use replstatus_core::protocol::THRESHOLD_WAIT;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    #[tokio::test]
    async fn test_reads_numeric_threshold() {
        // Arrange
        let mut conn = tokio_test::io::Builder::new().read(b"60").build();

        // Act
        let threshold = read_threshold(&mut conn, THRESHOLD_WAIT).await;

        // Assert
        assert_eq!(threshold, Some(60));
    }

    #[tokio::test]
    async fn test_trailing_newline_is_ignored() {
        let mut conn = tokio_test::io::Builder::new().read(b"10\r\n").build();
        assert_eq!(read_threshold(&mut conn, THRESHOLD_WAIT).await, Some(10));
    }

    #[tokio::test]
    async fn test_non_numeric_input_is_absent() {
        let mut conn = tokio_test::io::Builder::new().read(b"abc").build();
        assert_eq!(read_threshold(&mut conn, THRESHOLD_WAIT).await, None);
    }

    #[tokio::test]
    async fn test_overflowing_input_is_absent() {
        let mut conn = tokio_test::io::Builder::new()
            .read(b"123456789012345")
            .build();
        assert_eq!(read_threshold(&mut conn, THRESHOLD_WAIT).await, None);
    }

    #[tokio::test]
    async fn test_read_error_is_absent() {
        let mut conn = tokio_test::io::Builder::new()
            .read_error(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            .build();
        assert_eq!(read_threshold(&mut conn, THRESHOLD_WAIT).await, None);
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        // Arrange: a real socket pair where the client never writes
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        let (mut server_side, _) = listener.accept().await.unwrap();

        // Act
        let started = std::time::Instant::now();
        let threshold = read_threshold(&mut server_side, THRESHOLD_WAIT).await;

        // Assert: absent, after actually waiting, and the wait stayed bounded
        assert_eq!(threshold, None);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_closed_client_is_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (mut server_side, _) = listener.accept().await.unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(read_threshold(&mut server_side, THRESHOLD_WAIT).await, None);
    }
}
