//! # replstatus-core
//!
//! Shared library for the replstatus oracle: the pure logic that decides
//! whether a replicated database node is usable as a write primary, as a
//! caught-up read replica, or not at all.
//!
//! This crate performs no I/O.  It has no sockets, no files and no async
//! runtime, so every rule it encodes can be tested with plain values.
//!
//! # Architecture overview
//!
//! A load balancer opens a TCP connection to the oracle and receives one of
//! three ASCII tokens.  Everything needed to pick that token lives here:
//!
//! - **`domain`** – The replication vocabulary: [`Status`] and its wire
//!   tokens, log sequence numbers ([`Lsn`]), the [`ReplicationState`]
//!   collaborator trait and the per-connection [`ReplicationSnapshot`], and the
//!   [`StatusResolver`] that turns a snapshot into a status.
//!
//! - **`protocol`** – The optional client-supplied delay threshold: how long
//!   the server waits for it, how much it reads, and how the bytes are parsed.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `replstatus_core::Status` instead of `replstatus_core::domain::status::Status`.
pub use domain::lsn::{Lsn, LsnParseError};
pub use domain::resolver::StatusResolver;
pub use domain::snapshot::{ReplicationSnapshot, ReplicationState};
pub use domain::status::{Status, TokenError};
pub use protocol::threshold::{parse_threshold, ThresholdError};
