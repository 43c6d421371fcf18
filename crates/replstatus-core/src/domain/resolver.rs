//! Status classification.
//!
//! [`StatusResolver`] turns a [`ReplicationSnapshot`] into a [`Status`] in two
//! steps:
//!
//! 1. [`classify`](StatusResolver::classify) decides from the snapshot alone.
//! 2. [`adjust`](StatusResolver::adjust) optionally demotes a lagging standby
//!    to `Offline` when the client supplied a delay threshold that the
//!    replica's apply delay exceeds.
//!
//! ```text
//! in_recovery?  ── no ──────────────────────────────▶ Primary
//!     │ yes
//! receiver alive? ── no ────────────────────────────▶ Offline
//!     │ yes
//! replay == receive? ── yes ────────────────────────▶ Standby
//!     │ no (lag)
//! threshold T > 0 and now - last_applied > T? ─ yes ▶ Offline
//!     │ no / unknown
//!     ▼
//!   Standby
//! ```
//!
//! Unknown tolerance is permissive: a client that does not send a threshold
//! gets plain caught-up-versus-not semantics.

use tracing::debug;

use crate::domain::snapshot::ReplicationSnapshot;
use crate::domain::status::Status;

/// Stateless classifier for replication snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusResolver;

impl StatusResolver {
    /// Classifies a snapshot without any client input.
    ///
    /// A lagging standby is reported as `Standby` here; the caller may refine
    /// it with [`adjust`](Self::adjust).
    pub fn classify(snapshot: &ReplicationSnapshot) -> Status {
        if !snapshot.in_recovery {
            return Status::Primary;
        }
        if !snapshot.receiver_alive {
            return Status::Offline;
        }
        // Caught up or lagging, the preliminary answer is the same.
        Status::Standby
    }

    /// `true` when a delay threshold could change the answer for `snapshot`.
    ///
    /// That is the case for a standby with a live receiver, some replay lag
    /// and a known last-applied transaction time.  Only then is it worth
    /// waiting for the client to send a threshold.
    pub fn needs_threshold(snapshot: &ReplicationSnapshot) -> bool {
        Self::classify(snapshot) == Status::Standby
            && snapshot.has_lag()
            && snapshot.last_applied_tx_time.is_some()
    }

    /// Refines a preliminary status using the client's delay threshold.
    ///
    /// Only a `Standby` that satisfies [`needs_threshold`](Self::needs_threshold)
    /// can change; every other input is returned unchanged.  An absent or
    /// non-positive threshold means "no constraint".
    pub fn adjust(
        preliminary: Status,
        threshold: Option<i32>,
        snapshot: &ReplicationSnapshot,
    ) -> Status {
        if preliminary != Status::Standby || !snapshot.has_lag() {
            return preliminary;
        }
        let Some(last_applied) = snapshot.last_applied_tx_time else {
            return preliminary;
        };
        let threshold = match threshold {
            Some(t) if t > 0 => i64::from(t),
            _ => return Status::Standby,
        };

        let elapsed_seconds = (snapshot.now - last_applied).num_seconds();
        if elapsed_seconds > threshold {
            debug!("standby is {elapsed_seconds}s behind, client allows {threshold}s");
            Status::Offline
        } else {
            Status::Standby
        }
    }

    /// Classifies and adjusts in one call.
    pub fn resolve(snapshot: &ReplicationSnapshot, threshold: Option<i32>) -> Status {
        let preliminary = Self::classify(snapshot);
        if Self::needs_threshold(snapshot) {
            Self::adjust(preliminary, threshold, snapshot)
        } else {
            preliminary
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
