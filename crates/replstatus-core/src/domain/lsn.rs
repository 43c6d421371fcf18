//! Log sequence numbers.
//!
//! An [`Lsn`] marks a byte position in the replicated change stream.  Standbys
//! expose two of them: how far the stream has been *received* and how far it
//! has been *replayed*.  Equal values mean the replica is fully caught up.
//!
//! The textual form is the conventional pair of hexadecimal halves separated
//! by a slash, e.g. `16/B374D848` for `0x16_B374_D848`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an LSN string is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LsnParseError {
    /// The `/` separator between the two halves is missing.
    #[error("missing '/' separator in LSN {0:?}")]
    MissingSeparator(String),

    /// One of the halves is not a 32-bit hexadecimal number.
    #[error("invalid hexadecimal half in LSN {0:?}")]
    InvalidHalf(String),
}

/// A position in the write-ahead log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Lsn(pub u64);

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
    }
}

impl FromStr for Lsn {
    type Err = LsnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hi, lo) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| LsnParseError::MissingSeparator(s.to_string()))?;
        let parse_half = |half: &str| {
            u32::from_str_radix(half, 16).map_err(|_| LsnParseError::InvalidHalf(s.to_string()))
        };
        let hi = parse_half(hi)?;
        let lo = parse_half(lo)?;
        Ok(Self((u64::from(hi) << 32) | u64::from(lo)))
    }
}

impl TryFrom<String> for Lsn {
    type Error = LsnParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Lsn> for String {
    fn from(lsn: Lsn) -> Self {
        lsn.to_string()
    }
}
