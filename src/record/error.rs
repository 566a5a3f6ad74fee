//! Errors raised while decoding segment payloads into typed records.

use thiserror::Error;

/// Reasons a segment payload could not be decoded.
///
/// Every variant names the record kind so a log line can point at the
/// decoder whose layout no longer matches the traffic.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is shorter than the layout requires.
    #[error("{record} payload too short: need {need} bytes, have {have}")]
    TooShort {
        /// Record kind being decoded.
        record: &'static str,
        /// Bytes required by the layout.
        need: usize,
        /// Bytes actually present.
        have: usize,
    },

    /// The layout requires an exact length and the payload differs.
    #[error("{record} payload has invalid length: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Record kind being decoded.
        record: &'static str,
        /// Exact length required by the layout.
        expected: usize,
        /// Length of the payload.
        actual: usize,
    },

    /// The payload carries no bytes at all.
    #[error("{record} payload is empty")]
    Empty {
        /// Record kind being decoded.
        record: &'static str,
    },
}
