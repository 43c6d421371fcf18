//! Application layer: what happens to one accepted connection.
//!
//! # Sub-modules
//!
//! - **`replication_source`** – The [`ReplicationSource`] seam through which
//!   the handler obtains a fresh snapshot.  Production reads a status file;
//!   embedders and tests hand in any [`replstatus_core::ReplicationState`].
//!
//! - **`delay_read`** – The bounded, optional read of a client-supplied delay
//!   threshold.
//!
//! - **`handle_connection`** – [`ConnectionHandler`]: snapshot, classify,
//!   optionally read the threshold, write the token, close.
//!
//! Both I/O-facing pieces are generic over tokio's `AsyncRead`/`AsyncWrite`
//! traits rather than `TcpStream`, so they are tested against in-memory
//! mocks.

pub mod delay_read;
pub mod handle_connection;
pub mod replication_source;

pub use delay_read::read_threshold;
pub use handle_connection::{ConnectionHandler, HandleError};
pub use replication_source::{FixedSource, ReplicationSource, SourceError, StateSource};
