//! Replication state as seen by the oracle.
//!
//! The database engine owns the real replication state; the oracle only
//! queries it.  [`ReplicationState`] is that query interface, and
//! [`ReplicationSnapshot`] is a coherent copy of it taken once per connection
//! so that a single classification never mixes values read at different
//! moments.

use chrono::{DateTime, Utc};

use crate::domain::lsn::Lsn;

/// Query interface to the replication subsystem of the surrounding engine.
///
/// Implementations must be cheap to call; the oracle calls [`snapshot`]
/// once for every accepted connection.
///
/// [`snapshot`]: ReplicationState::snapshot
pub trait ReplicationState {
    /// `true` while the node is replaying a primary's change stream.
    fn is_in_recovery(&self) -> bool;

    /// `true` while the standby's receiver is connected to its upstream.
    fn is_receiver_alive(&self) -> bool;

    /// How far the change stream has been applied.
    fn replay_position(&self) -> Lsn;

    /// How far the change stream has been received.
    fn receive_position(&self) -> Lsn;

    /// Commit time of the last transaction applied on this node, if known.
    fn last_applied_transaction_time(&self) -> Option<DateTime<Utc>>;

    /// Current wall-clock time, as seen by the engine.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Reads every metric exactly once into a [`ReplicationSnapshot`].
    fn snapshot(&self) -> ReplicationSnapshot {
        ReplicationSnapshot {
            in_recovery: self.is_in_recovery(),
            receiver_alive: self.is_receiver_alive(),
            replay_position: self.replay_position(),
            receive_position: self.receive_position(),
            last_applied_tx_time: self.last_applied_transaction_time(),
            now: self.now(),
        }
    }
}

/// A point-in-time copy of the replication metrics.
///
/// Lives for a single connection and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationSnapshot {
    pub in_recovery: bool,
    pub receiver_alive: bool,
    pub replay_position: Lsn,
    pub receive_position: Lsn,
    pub last_applied_tx_time: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl ReplicationSnapshot {
    /// A writable primary observed at `now`.
    pub fn primary(now: DateTime<Utc>) -> Self {
        Self {
            in_recovery: false,
            receiver_alive: false,
            replay_position: Lsn::default(),
            receive_position: Lsn::default(),
            last_applied_tx_time: None,
            now,
        }
    }

    /// A standby with a live receiver and the given positions, observed at `now`.
    pub fn standby(replay: Lsn, receive: Lsn, now: DateTime<Utc>) -> Self {
        Self {
            in_recovery: true,
            receiver_alive: true,
            replay_position: replay,
            receive_position: receive,
            last_applied_tx_time: None,
            now,
        }
    }

    /// Returns a copy with the last-applied transaction time set.
    pub fn with_last_applied(mut self, at: DateTime<Utc>) -> Self {
        self.last_applied_tx_time = Some(at);
        self
    }

    /// Returns a copy with the receiver marked as disconnected.
    pub fn with_receiver_down(mut self) -> Self {
        self.receiver_alive = false;
        self
    }

    /// `true` when some received changes have not been replayed yet.
    ///
    /// Only equality matters; the magnitude of the gap is not used.
    pub fn has_lag(&self) -> bool {
        self.replay_position != self.receive_position
    }
}

impl ReplicationState for ReplicationSnapshot {
    fn is_in_recovery(&self) -> bool {
        self.in_recovery
    }

    fn is_receiver_alive(&self) -> bool {
        self.receiver_alive
    }

    fn replay_position(&self) -> Lsn {
        self.replay_position
    }

    fn receive_position(&self) -> Lsn {
        self.receive_position
    }

    fn last_applied_transaction_time(&self) -> Option<DateTime<Utc>> {
        self.last_applied_tx_time
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn snapshot(&self) -> ReplicationSnapshot {
        self.clone()
    }
}
