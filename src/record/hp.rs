//! Hit point change records.

use serde::Serialize;

use super::DecodeError;
use crate::byte_order::u32_at;

/// Minimum payload length of an HP segment.
pub const HP_MIN_LEN: usize = 20;

/// A change to an entity's hit points.
///
/// `damage` is the drop from `prev` to `current`; healing reports zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HpData {
    pub target_id: u32,
    pub prev: u32,
    pub current: u32,
    pub damage: u32,
}

/// Decode an HP segment.
///
/// # Errors
///
/// Returns [`DecodeError::TooShort`] when the payload holds fewer than
/// [`HP_MIN_LEN`] bytes.
pub fn decode_hp(bytes: &[u8]) -> Result<HpData, DecodeError> {
    let field = |offset| {
        u32_at(bytes, offset).ok_or(DecodeError::TooShort {
            record: "hp",
            need: HP_MIN_LEN,
            have: bytes.len(),
        })
    };
    let target_id = field(0)?;
    let prev = field(8)?;
    let current = field(16)?;

    Ok(HpData {
        target_id,
        prev,
        current,
        damage: prev.saturating_sub(current),
    })
}
