//! Replication state published by the database engine as a JSON file.
//!
//! The engine rewrites the file whenever its replication state changes.  The
//! oracle re-reads it for every connection, so there is no cache to go stale.
//!
//! ```json
//! {
//!   "in_recovery": true,
//!   "receiver_alive": true,
//!   "replay_lsn": "0/16B3748",
//!   "receive_lsn": "0/16B3790",
//!   "last_applied_at": "2026-03-01T12:00:00Z"
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use replstatus_core::{Lsn, ReplicationSnapshot};
use serde::Deserialize;

use crate::application::{ReplicationSource, SourceError};

/// On-disk document.  Unknown fields are ignored so the engine may publish
/// more than the oracle reads.
#[derive(Debug, Deserialize)]
struct StatusDocument {
    in_recovery: bool,
    #[serde(default)]
    receiver_alive: bool,
    #[serde(default)]
    replay_lsn: Lsn,
    #[serde(default)]
    receive_lsn: Lsn,
    #[serde(default)]
    last_applied_at: Option<DateTime<Utc>>,
}

impl StatusDocument {
    fn into_snapshot(self, now: DateTime<Utc>) -> ReplicationSnapshot {
        ReplicationSnapshot {
            in_recovery: self.in_recovery,
            receiver_alive: self.receiver_alive,
            replay_position: self.replay_lsn,
            receive_position: self.receive_lsn,
            last_applied_tx_time: self.last_applied_at,
            now,
        }
    }
}

/// Reads a [`ReplicationSnapshot`] from a status file on every call.
#[derive(Debug, Clone)]
pub struct StatusFileSource {
    path: PathBuf,
}

impl StatusFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReplicationSource for StatusFileSource {
    fn snapshot(&self) -> Result<ReplicationSnapshot, SourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Read {
            path: self.path.clone(),
            source,
        })?;
        let now = Utc::now();
        let document: StatusDocument =
            serde_json::from_str(&text).map_err(|e| SourceError::Malformed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(document.into_snapshot(now))
    }
}
