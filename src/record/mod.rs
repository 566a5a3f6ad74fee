//! Typed combat records and the decoders that produce them.
//!
//! Each decoder is a pure function from a segment payload to a record. The
//! [`decode_segment`] entry point looks the segment's type ID up in a static
//! dispatch table; type IDs outside the table are ignored so new message
//! kinds in the game protocol never disturb decoding of the known ones.

pub mod action;
pub mod attack;
pub mod error;
pub mod hp;
pub mod opaque;

pub use action::{ACTION_MIN_LEN, ActionData, decode_action};
pub use attack::{
    ATTACK_LEN,
    AttackData,
    AttackFlags,
    DAMAGE_FLAGS,
    FLAG_FIELD_LEN,
    FlagDef,
    decode_attack,
};
pub use error::DecodeError;
pub use hp::{HP_MIN_LEN, HpData, decode_hp};
pub use opaque::{OpaqueData, decode_opaque};
use serde::Serialize;

/// Segment type carrying an [`AttackData`] record.
pub const ATTACK_TYPE: u32 = 10_308;
/// Segment type carrying an [`ActionData`] record.
pub const ACTION_TYPE: u32 = 100_041;
/// Segment type carrying an [`HpData`] record.
pub const HP_TYPE: u32 = 100_178;
/// Segment types carrying self-inflicted damage.
pub const SELF_DAMAGE_TYPES: [u32; 2] = [10_701, 10_719];
/// Segment types carrying item usage.
pub const ITEM_TYPES: [u32; 2] = [100_321, 100_322];

/// One decoded segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedRecord {
    Attack(AttackData),
    Action(ActionData),
    Hp(HpData),
    SelfDamage(OpaqueData),
    Item(OpaqueData),
}

impl DecodedRecord {
    /// Short name of the record kind, used in logs and metric labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attack(_) => "attack",
            Self::Action(_) => "action",
            Self::Hp(_) => "hp",
            Self::SelfDamage(_) => "self_damage",
            Self::Item(_) => "item",
        }
    }
}

type Decoder = fn(u32, &[u8]) -> Result<DecodedRecord, DecodeError>;

fn attack(_: u32, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    decode_attack(bytes).map(DecodedRecord::Attack)
}

fn action(_: u32, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    decode_action(bytes).map(DecodedRecord::Action)
}

fn hp(_: u32, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    decode_hp(bytes).map(DecodedRecord::Hp)
}

fn self_damage(type_id: u32, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    decode_opaque("self_damage", type_id, bytes).map(DecodedRecord::SelfDamage)
}

fn item(type_id: u32, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    decode_opaque("item", type_id, bytes).map(DecodedRecord::Item)
}

/// Type ID to decoder lookup table.
const DECODERS: [(u32, Decoder); 7] = [
    (ATTACK_TYPE, attack),
    (ACTION_TYPE, action),
    (HP_TYPE, hp),
    (SELF_DAMAGE_TYPES[0], self_damage),
    (SELF_DAMAGE_TYPES[1], self_damage),
    (ITEM_TYPES[0], item),
    (ITEM_TYPES[1], item),
];

/// Whether `type_id` has a decoder.
#[must_use]
pub fn is_known_type(type_id: u32) -> bool { DECODERS.iter().any(|(id, _)| *id == type_id) }

/// Decode a segment payload according to its type ID.
///
/// Returns `None` for type IDs without a decoder and `Some` with the
/// decoder's outcome otherwise.
///
/// # Examples
///
/// ```
/// use combat_dissector::record::{DecodedRecord, HP_TYPE, decode_segment};
///
/// let mut payload = [0_u8; 20];
/// payload[8] = 100;
/// payload[16] = 40;
/// let Some(Ok(DecodedRecord::Hp(hp))) = decode_segment(HP_TYPE, &payload) else {
///     panic!("expected an HP record");
/// };
/// assert_eq!(hp.damage, 60);
/// assert!(decode_segment(1, &payload).is_none());
/// ```
#[must_use]
pub fn decode_segment(type_id: u32, bytes: &[u8]) -> Option<Result<DecodedRecord, DecodeError>> {
    DECODERS
        .iter()
        .find(|(id, _)| *id == type_id)
        .map(|(_, decoder)| decoder(type_id, bytes))
}
