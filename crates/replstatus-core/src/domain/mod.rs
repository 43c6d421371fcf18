//! Domain model for replication status.
//!
//! Pure business rules with no OS dependencies.  The resolver is the only
//! piece with real policy in it; the other modules are the vocabulary it works
//! with.

pub mod lsn;
pub mod resolver;
pub mod snapshot;
pub mod status;
