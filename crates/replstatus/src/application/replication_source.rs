//! Where replication snapshots come from.

use std::path::PathBuf;

use replstatus_core::{ReplicationSnapshot, ReplicationState};
use thiserror::Error;

/// Error returned when the replication state cannot be obtained.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The state could not be read from its backing store.
    #[error("could not read replication state from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state was read but could not be understood.
    #[error("malformed replication state in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Supplies one coherent snapshot per connection.
///
/// Called exactly once for every accepted connection, before anything is
/// written to the client.
#[cfg_attr(test, mockall::automock)]
pub trait ReplicationSource {
    /// Captures the current replication state.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the state is unavailable.  The handler then
    /// answers `OFFLINE`.
    fn snapshot(&self) -> Result<ReplicationSnapshot, SourceError>;
}

/// Adapts any in-process [`ReplicationState`] into a [`ReplicationSource`].
///
/// Wrapping a [`ReplicationSnapshot`] gives a source that always reports the
/// same state, which is what tests and `--assume-primary` use.
#[derive(Debug, Clone)]
pub struct StateSource<T> {
    state: T,
}

impl<T: ReplicationState> StateSource<T> {
    pub fn new(state: T) -> Self {
        Self { state }
    }
}

/// A source that always reports one stored snapshot.
pub type FixedSource = StateSource<ReplicationSnapshot>;

impl<T: ReplicationState> ReplicationSource for StateSource<T> {
    fn snapshot(&self) -> Result<ReplicationSnapshot, SourceError> {
        Ok(self.state.snapshot())
    }
}

impl<S: ReplicationSource + ?Sized> ReplicationSource for Box<S> {
    fn snapshot(&self) -> Result<ReplicationSnapshot, SourceError> {
        (**self).snapshot()
    }
}
