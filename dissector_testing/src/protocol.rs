//! Builders for protocol envelopes and record payloads.

use std::io::Write;

use brotli::CompressorWriter;

const START_MARKER: [u8; 9] = [0x68, 0x27, 0, 0, 0, 0, 0, 0, 0];
const END_MARKER: [u8; 9] = [0xe3, 0x27, 0, 0, 0, 0, 0, 0, 0];

fn header(type_id: u32, len: usize, tag: u8) -> Vec<u8> {
    let len = u32::try_from(len).expect("segment payload fits in u32");
    let mut bytes = Vec::with_capacity(9);
    bytes.extend_from_slice(&type_id.to_le_bytes());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.push(tag);
    bytes
}

/// Encode an uncompressed segment.
#[must_use]
pub fn segment(type_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut bytes = header(type_id, payload.len(), 0);
    bytes.extend_from_slice(payload);
    bytes
}

/// Encode a Brotli-compressed segment carrying `payload`.
#[must_use]
pub fn brotli_segment(type_id: u32, payload: &[u8]) -> Vec<u8> {
    let compressed = compress(payload);
    let mut bytes = header(type_id, compressed.len(), 1);
    bytes.extend_from_slice(&compressed);
    bytes
}

/// Wrap encoded segments between the envelope markers.
#[must_use]
pub fn envelope(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = START_MARKER.to_vec();
    for segment in segments {
        bytes.extend_from_slice(segment);
    }
    bytes.extend_from_slice(&END_MARKER);
    bytes
}

/// Brotli-compress `data`.
///
/// # Panics
///
/// Panics if the in-memory compressor fails.
#[must_use]
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut writer = CompressorWriter::new(Vec::new(), 4096, 5, 22);
    writer.write_all(data).expect("compress payload");
    writer.into_inner()
}

/// Attack record payload with the given identifiers and flag bytes.
#[must_use]
pub fn attack_payload(user_id: u32, target_id: u32, key1: u32, key2: u32, flags: [u8; 7]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(35);
    bytes.extend_from_slice(&user_id.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&target_id.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&key1.to_le_bytes());
    bytes.extend_from_slice(&key2.to_le_bytes());
    bytes.extend_from_slice(&flags);
    bytes.extend_from_slice(&[0; 4]);
    bytes
}

/// HP record payload moving `target_id` from `prev_hp` to `current_hp`.
#[must_use]
pub fn hp_payload(target_id: u32, prev_hp: u32, current_hp: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(20);
    bytes.extend_from_slice(&target_id.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&prev_hp.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&current_hp.to_le_bytes());
    bytes
}
