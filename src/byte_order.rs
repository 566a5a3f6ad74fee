//! Helpers for explicit little-endian field access.
//!
//! Every multi-byte field in the combat protocol is little-endian. These
//! helpers keep Clippy expectations scoped to the conversion points so
//! decoders stay explicit about wire endianness, and the offset readers turn
//! out-of-range reads into `None` rather than a panic.

/// Serialise a `u32` in little-endian byte order.
///
/// # Examples
///
/// ```
/// use combat_dissector::byte_order::write_le_u32;
///
/// assert_eq!(write_le_u32(0x1234_5678), [0x78, 0x56, 0x34, 0x12]);
/// ```
#[must_use]
pub fn write_le_u32(value: u32) -> [u8; 4] {
    #[expect(
        clippy::little_endian_bytes,
        reason = "The combat protocol is little-endian on the wire."
    )]
    value.to_le_bytes()
}

/// Parse a little-endian `u32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use combat_dissector::byte_order::read_le_u32;
///
/// assert_eq!(read_le_u32([0x78, 0x56, 0x34, 0x12]), 0x1234_5678);
/// ```
#[must_use]
pub fn read_le_u32(bytes: [u8; 4]) -> u32 {
    #[expect(
        clippy::little_endian_bytes,
        reason = "The combat protocol is little-endian on the wire."
    )]
    u32::from_le_bytes(bytes)
}

/// Read a little-endian `u32` starting at `offset`.
///
/// Returns `None` when fewer than four bytes remain at `offset`.
///
/// # Examples
///
/// ```
/// use combat_dissector::byte_order::u32_at;
///
/// let bytes = [0xff, 0x01, 0x00, 0x00, 0x00];
/// assert_eq!(u32_at(&bytes, 1), Some(1));
/// assert_eq!(u32_at(&bytes, 2), None);
/// ```
#[must_use]
pub fn u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let field: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(read_le_u32(field))
}

/// Read a little-endian `u32` at `offset` and widen it to `usize`.
///
/// Used for length fields that index into the surrounding buffer.
#[must_use]
pub fn len_at(bytes: &[u8], offset: usize) -> Option<usize> {
    u32_at(bytes, offset).and_then(|value| usize::try_from(value).ok())
}
