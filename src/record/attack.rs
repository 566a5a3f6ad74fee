//! Attack records and the packed damage flag field.

use serde::{Serialize, Serializer};

use super::DecodeError;
use crate::byte_order::u32_at;

/// Exact payload length of an attack segment.
pub const ATTACK_LEN: usize = 35;

/// Offset of the packed flag field inside an attack payload.
const FLAGS_OFFSET: usize = 24;

/// Width of the packed flag field in bytes.
pub const FLAG_FIELD_LEN: usize = 7;

/// One named bit inside the packed flag field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagDef {
    /// Byte of the flag field holding the bit.
    pub index: usize,
    /// Mask selecting the bit within that byte.
    pub mask: u8,
    /// Name reported for the flag.
    pub name: &'static str,
}

const fn flag(index: usize, mask: u8, name: &'static str) -> FlagDef { FlagDef { index, mask, name } }

/// Named damage flags in reporting order.
///
/// Names such as `what1` keep the reverse-engineered labels for bits whose
/// meaning is still unknown.
pub const DAMAGE_FLAGS: [FlagDef; 24] = [
    flag(0, 1, "crit"),
    flag(0, 2, "what1"),
    flag(0, 4, "unguarded"),
    flag(0, 8, "break"),
    flag(0, 16, "what05"),
    flag(0, 32, "what06"),
    flag(0, 64, "first_hit"),
    flag(0, 128, "default_attack"),
    flag(1, 1, "multi_attack"),
    flag(1, 2, "power"),
    flag(1, 4, "fast"),
    flag(1, 8, "dot1"),
    flag(1, 128, "dot2"),
    flag(2, 1, "dot3"),
    flag(3, 8, "add_hit"),
    flag(3, 16, "bleed"),
    flag(3, 32, "dark"),
    flag(3, 64, "fire"),
    flag(3, 128, "holy"),
    flag(4, 1, "ice"),
    flag(4, 2, "electric"),
    flag(4, 4, "poison"),
    flag(4, 8, "mind"),
    flag(4, 16, "dot4"),
];

/// Decoded state of every entry in [`DAMAGE_FLAGS`].
///
/// Each named flag is always present with an explicit value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackFlags {
    values: [bool; DAMAGE_FLAGS.len()],
}

impl AttackFlags {
    /// Evaluate the flag table against a packed flag field.
    ///
    /// Table entries whose byte index lies outside `field` decode as
    /// `false`.
    #[must_use]
    pub fn from_field(field: &[u8]) -> Self {
        let mut values = [false; DAMAGE_FLAGS.len()];
        for (value, def) in values.iter_mut().zip(DAMAGE_FLAGS.iter()) {
            *value = field.get(def.index).is_some_and(|byte| byte & def.mask != 0);
        }
        Self { values }
    }

    /// Look up a flag by name.
    ///
    /// Returns `None` when `name` is not part of the flag table.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<bool> {
        DAMAGE_FLAGS
            .iter()
            .position(|def| def.name == name)
            .map(|position| self.values[position])
    }

    /// Iterate over `(name, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        DAMAGE_FLAGS
            .iter()
            .zip(self.values.iter())
            .map(|(def, value)| (def.name, *value))
    }

    /// Names of the flags that are set.
    #[must_use]
    pub fn set_names(&self) -> Vec<&'static str> {
        self.iter().filter(|(_, set)| *set).map(|(name, _)| name).collect()
    }
}

impl Serialize for AttackFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// A hit dealt by one entity to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttackData {
    pub user_id: u32,
    pub target_id: u32,
    pub key1: u32,
    pub key2: u32,
    pub flags: AttackFlags,
}

/// Decode an attack segment.
///
/// # Errors
///
/// Returns [`DecodeError::LengthMismatch`] unless the payload is exactly
/// [`ATTACK_LEN`] bytes long.
pub fn decode_attack(bytes: &[u8]) -> Result<AttackData, DecodeError> {
    if bytes.len() != ATTACK_LEN {
        return Err(DecodeError::LengthMismatch {
            record: "attack",
            expected: ATTACK_LEN,
            actual: bytes.len(),
        });
    }
    let field = |offset| {
        u32_at(bytes, offset).ok_or(DecodeError::TooShort {
            record: "attack",
            need: ATTACK_LEN,
            have: bytes.len(),
        })
    };

    Ok(AttackData {
        user_id: field(0)?,
        target_id: field(8)?,
        key1: field(16)?,
        key2: field(20)?,
        flags: AttackFlags::from_field(&bytes[FLAGS_OFFSET..FLAGS_OFFSET + FLAG_FIELD_LEN]),
    })
}
