//! Node status and its wire representation.
//!
//! The server answers every connection with exactly one of three ASCII tokens,
//! without a delimiter or length prefix:
//!
//! | Status      | Token      |
//! |-------------|------------|
//! | `Primary`   | `MASTER`   |
//! | `Standby`   | `STANDBY`  |
//! | `Offline`   | `OFFLINE`  |
//!
//! The writable-node token keeps its historical name; existing health-check
//! scripts match on the literal bytes.

use std::fmt;

use thiserror::Error;

/// Error returned when a server reply is not one of the known tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The reply was empty (the server closed without writing).
    #[error("empty status reply")]
    Empty,

    /// The reply did not match any status token.
    #[error("unrecognised status token: {0:?}")]
    Unknown(String),
}

/// Usability of a node as a routing target.
///
/// Health order is `Primary > Standby > Offline`, but the server never compares
/// statuses across connections: each request is classified on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The node accepts writes.
    Primary,
    /// The node is a replica that can serve reads.
    Standby,
    /// The node must not receive traffic.
    Offline,
}

impl Status {
    /// Returns the canonical ASCII token written to the client.
    pub const fn token(self) -> &'static [u8] {
        match self {
            Self::Primary => b"MASTER",
            Self::Standby => b"STANDBY",
            Self::Offline => b"OFFLINE",
        }
    }

    /// Returns the token as a string slice, for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "MASTER",
            Self::Standby => "STANDBY",
            Self::Offline => "OFFLINE",
        }
    }

    /// Parses a complete server reply back into a [`Status`].
    ///
    /// Trailing ASCII whitespace is tolerated so replies captured through
    /// tools like `nc` that append a newline still decode.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Empty`] for an empty reply and
    /// [`TokenError::Unknown`] for anything else that is not a token.
    pub fn from_token(reply: &[u8]) -> Result<Self, TokenError> {
        let end = reply
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |last| last + 1);
        let trimmed = &reply[..end];
        if trimmed.is_empty() {
            return Err(TokenError::Empty);
        }
        [Self::Primary, Self::Standby, Self::Offline]
            .into_iter()
            .find(|status| status.token() == trimmed)
            .ok_or_else(|| TokenError::Unknown(String::from_utf8_lossy(trimmed).into_owned()))
    }

    /// Returns `true` if a load balancer may route traffic to this node.
    pub const fn is_routable(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
