//! Client-facing protocol pieces shared by the server and the probe client.
//!
//! The status reply itself is just [`crate::Status::token`]; the only input a
//! client can send is the optional delay threshold handled in [`threshold`].

pub mod threshold;

pub use threshold::{parse_threshold, ThresholdError, THRESHOLD_BUFFER_LEN, THRESHOLD_WAIT};
