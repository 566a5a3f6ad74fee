//! Skill activation records.

use serde::Serialize;

use super::DecodeError;
use crate::byte_order::{len_at, u32_at};

/// Bytes preceding the variable-length skill name.
pub const ACTION_MIN_LEN: usize = 12;

/// Gap between the end of the skill name and the `key1` field.
const KEY1_GAP: usize = 8;

/// A skill used by an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionData {
    pub user_id: u32,
    pub skill_name: String,
    pub key1: u32,
}

/// Decode an action segment.
///
/// Layout: `user_id` at 0, the skill name length at 8, the name itself at
/// 12 and `key1` eight bytes after the name. NUL bytes are stripped from
/// the name before surrounding whitespace is trimmed.
///
/// # Errors
///
/// Returns [`DecodeError::TooShort`] when the fixed prefix, the declared
/// name, or the trailing `key1` field runs past the payload.
pub fn decode_action(bytes: &[u8]) -> Result<ActionData, DecodeError> {
    let too_short = |need| DecodeError::TooShort {
        record: "action",
        need,
        have: bytes.len(),
    };
    if bytes.len() < ACTION_MIN_LEN {
        return Err(too_short(ACTION_MIN_LEN));
    }

    let user_id = u32_at(bytes, 0).ok_or_else(|| too_short(ACTION_MIN_LEN))?;
    let name_len = len_at(bytes, 8).ok_or_else(|| too_short(ACTION_MIN_LEN))?;
    let name_end = ACTION_MIN_LEN
        .checked_add(name_len)
        .ok_or_else(|| too_short(usize::MAX))?;
    let name = bytes.get(ACTION_MIN_LEN..name_end).ok_or_else(|| too_short(name_end))?;
    let key1_offset = name_end.saturating_add(KEY1_GAP);
    let key1 = u32_at(bytes, key1_offset).ok_or_else(|| too_short(key1_offset.saturating_add(4)))?;

    Ok(ActionData {
        user_id,
        skill_name: skill_name(name),
        key1,
    })
}

fn skill_name(raw: &[u8]) -> String {
    let stripped: Vec<u8> = raw.iter().copied().filter(|byte| *byte != 0).collect();
    String::from_utf8_lossy(&stripped).trim().to_owned()
}
