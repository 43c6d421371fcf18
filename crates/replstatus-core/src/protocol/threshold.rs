//! Delay threshold micro-protocol.
//!
//! Right after connecting, a client may write a decimal integer: the largest
//! replication delay, in seconds, it is willing to tolerate.  No delimiter is
//! required.  The server waits at most [`THRESHOLD_WAIT`] for it and reads at
//! most [`THRESHOLD_BUFFER_LEN`] bytes.
//!
//! Parsing follows C `strtol` conventions: leading whitespace and one sign
//! character are accepted, and anything after the digit run is ignored, so
//! `"10\r\n"` and `"10 please"` both mean ten seconds.

use std::time::Duration;

use thiserror::Error;

/// How long the server waits for a threshold before answering without one.
pub const THRESHOLD_WAIT: Duration = Duration::from_millis(100);

/// Maximum number of bytes read from the client.
pub const THRESHOLD_BUFFER_LEN: usize = 100;

/// Reasons a threshold could not be parsed.
///
/// The server treats both as "no threshold supplied"; they never fail the
/// connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThresholdError {
    /// The input does not start with a decimal number.
    #[error("delay threshold is not a number: {0:?}")]
    NotANumber(String),

    /// The number does not fit in a 32-bit signed integer.
    #[error("delay threshold out of range: {0:?}")]
    OutOfRange(String),
}

/// Parses a client-supplied delay threshold in seconds.
///
/// # Errors
///
/// Returns [`ThresholdError::NotANumber`] when no digits follow the optional
/// whitespace and sign, and [`ThresholdError::OutOfRange`] when the value
/// overflows `i32`.
///
/// # Examples
///
/// ```rust
/// use replstatus_core::parse_threshold;
///
/// assert_eq!(parse_threshold(b"60"), Ok(60));
/// assert_eq!(parse_threshold(b"  -5\n"), Ok(-5));
/// assert!(parse_threshold(b"abc").is_err());
/// ```
pub fn parse_threshold(input: &[u8]) -> Result<i32, ThresholdError> {
    let lossy = || String::from_utf8_lossy(input).into_owned();

    let mut rest = input;
    while let [first, tail @ ..] = rest {
        if !first.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return Err(ThresholdError::NotANumber(lossy()));
    }

    // Accumulate towards the sign so that i32::MIN is representable.
    let mut value: i32 = 0;
    for &b in &rest[..digits] {
        let digit = i32::from(b - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or_else(|| ThresholdError::OutOfRange(lossy()))?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number() {
        assert_eq!(parse_threshold(b"10"), Ok(10));
    }

    #[test]
    fn test_trailing_garbage_is_ignored() {
        assert_eq!(parse_threshold(b"60\r\n"), Ok(60));
        assert_eq!(parse_threshold(b"60seconds"), Ok(60));
    }

    #[test]
    fn test_leading_whitespace_and_sign() {
        assert_eq!(parse_threshold(b" \t+7"), Ok(7));
        assert_eq!(parse_threshold(b"-3"), Ok(-3));
    }

    #[test]
    fn test_non_numeric_input_is_rejected() {
        assert_eq!(
            parse_threshold(b"abc"),
            Err(ThresholdError::NotANumber("abc".to_string()))
        );
    }

    #[test]
    fn test_sign_without_digits_is_rejected() {
        assert!(matches!(
            parse_threshold(b"-"),
            Err(ThresholdError::NotANumber(_))
        ));
        assert!(matches!(
            parse_threshold(b""),
            Err(ThresholdError::NotANumber(_))
        ));
    }

    #[test]
    fn test_i32_limits() {
        assert_eq!(parse_threshold(b"2147483647"), Ok(i32::MAX));
        assert_eq!(parse_threshold(b"-2147483648"), Ok(i32::MIN));
    }

    #[test]
    fn test_overflow_is_out_of_range() {
        assert!(matches!(
            parse_threshold(b"2147483648"),
            Err(ThresholdError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_threshold(b"99999999999999999999"),
            Err(ThresholdError::OutOfRange(_))
        ));
    }
}
