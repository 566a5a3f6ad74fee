//! Records whose payload layout is not yet known.
//!
//! Self-damage and item segments are recognised by type ID but their field
//! layout has not been worked out, so the raw payload is kept intact for
//! offline analysis instead of guessing at fields.

use bytes::Bytes;
use serde::{Serialize, Serializer};

use super::DecodeError;

/// A recognised segment kept as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OpaqueData {
    pub type_id: u32,
    #[serde(serialize_with = "serialize_payload")]
    pub payload: Bytes,
}

impl OpaqueData {
    /// Number of payload bytes captured.
    #[must_use]
    pub fn len(&self) -> usize { self.payload.len() }

    /// Whether the payload is empty. Decoded records never are.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.payload.is_empty() }
}

fn serialize_payload<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(payload)
}

/// Keep a non-empty payload for the given record kind.
///
/// # Errors
///
/// Returns [`DecodeError::Empty`] when `bytes` is empty.
pub fn decode_opaque(
    record: &'static str,
    type_id: u32,
    bytes: &[u8],
) -> Result<OpaqueData, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty { record });
    }
    Ok(OpaqueData {
        type_id,
        payload: Bytes::copy_from_slice(bytes),
    })
}
