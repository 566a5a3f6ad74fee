//! Brotli inflation for compressed segment payloads.

use std::io::{self, Cursor, Read};

use brotli::Decompressor;
use thiserror::Error;

/// Largest payload an inflated segment may expand to.
pub const MAX_INFLATED_LEN: usize = 4 * 1024 * 1024;

const BUFFER_SIZE: usize = 4096;

/// Errors raised while inflating a segment payload.
#[derive(Debug, Error)]
pub enum InflateError {
    /// The compressed stream could not be decoded.
    #[error("corrupt brotli stream: {0}")]
    Corrupt(#[from] io::Error),
    /// The stream expands past [`MAX_INFLATED_LEN`].
    #[error("inflated payload exceeds {limit} bytes")]
    TooLarge {
        /// Configured output cap.
        limit: usize,
    },
}

/// Inflate a Brotli-compressed payload.
///
/// # Errors
///
/// Returns [`InflateError::Corrupt`] for malformed or truncated streams and
/// [`InflateError::TooLarge`] once the output would exceed
/// [`MAX_INFLATED_LEN`].
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>, InflateError> {
    let cap = u64::try_from(MAX_INFLATED_LEN)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut reader = Decompressor::new(Cursor::new(compressed), BUFFER_SIZE).take(cap);
    let mut inflated = Vec::new();
    reader.read_to_end(&mut inflated)?;
    if inflated.len() > MAX_INFLATED_LEN {
        return Err(InflateError::TooLarge {
            limit: MAX_INFLATED_LEN,
        });
    }
    Ok(inflated)
}
