//! Per-connection use case.
//!
//! [`ConnectionHandler`] runs one request to completion:
//!
//! 1. Take a fresh snapshot from the [`ReplicationSource`].
//! 2. Classify it.
//! 3. For a lagging standby with a known last-applied time, wait briefly for
//!    an optional delay threshold and adjust the status.
//! 4. Write the status token in a single write.  A short write is a failure;
//!    nothing is retried.
//! 5. Close the connection.  A failed close is logged only.
//!
//! The event loop awaits [`ConnectionHandler::handle`] inline, so no two
//! connections are ever handled at the same time.

use std::time::Duration;

use replstatus_core::protocol::THRESHOLD_WAIT;
use replstatus_core::{Status, StatusResolver};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::application::delay_read::read_threshold;
use crate::application::replication_source::ReplicationSource;

/// Per-connection failures.  None of them stop the server.
#[derive(Debug, Error)]
pub enum HandleError {
    /// Writing the status token failed outright.
    #[error("could not write {status}: {source}")]
    Write {
        status: Status,
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes than the token length were written.
    #[error("could not write {status}: short write ({written} of {expected} bytes)")]
    ShortWrite {
        status: Status,
        written: usize,
        expected: usize,
    },
}

/// Answers status queries using a [`ReplicationSource`].
pub struct ConnectionHandler<S> {
    source: S,
    threshold_wait: Duration,
}

impl<S: ReplicationSource> ConnectionHandler<S> {
    /// Creates a handler that waits the standard 100 ms for a threshold.
    pub fn new(source: S) -> Self {
        Self {
            source,
            threshold_wait: THRESHOLD_WAIT,
        }
    }

    /// Overrides how long to wait for a client threshold.
    pub fn with_threshold_wait(mut self, wait: Duration) -> Self {
        self.threshold_wait = wait;
        self
    }

    /// Handles one connection and logs the outcome.
    ///
    /// This is the entry point used by the event loop; errors are logged here
    /// and never propagated.
    pub async fn handle<C>(&self, conn: C, peer: &str)
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        match self.serve(conn).await {
            Ok(status) => debug!("answered {status} to {peer}"),
            Err(e) => warn!("connection from {peer} abandoned: {e}"),
        }
    }

    /// Runs the request and returns the status that was sent.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError`] if the token could not be written in full.  The
    /// connection is dropped (and therefore closed) in that case.
    pub async fn serve<C>(&self, mut conn: C) -> Result<Status, HandleError>
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        let status = self.resolve_status(&mut conn).await;

        let token = status.token();
        let written = conn
            .write(token)
            .await
            .map_err(|source| HandleError::Write { status, source })?;
        if written != token.len() {
            return Err(HandleError::ShortWrite {
                status,
                written,
                expected: token.len(),
            });
        }

        if let Err(e) = conn.shutdown().await {
            warn!("could not close connection after writing {status}: {e}");
        }
        Ok(status)
    }

    async fn resolve_status<C>(&self, conn: &mut C) -> Status
    where
        C: AsyncRead + Unpin,
    {
        let snapshot = match self.source.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("{e}; reporting {}", Status::Offline);
                return Status::Offline;
            }
        };

        let preliminary = StatusResolver::classify(&snapshot);
        if !StatusResolver::needs_threshold(&snapshot) {
            return preliminary;
        }

        let threshold = read_threshold(conn, self.threshold_wait).await;
        StatusResolver::adjust(preliminary, threshold, &snapshot)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
