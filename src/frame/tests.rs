//! Unit tests for envelope scanning and payload inflation.

use std::{borrow::Cow, io::Write};

use brotli::CompressorWriter;
use proptest::prelude::*;
use rstest::rstest;

use super::*;
use crate::byte_order::write_le_u32;

fn segment(type_id: u32, tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(SEGMENT_HEADER_LEN + payload.len());
    bytes.extend_from_slice(&write_le_u32(type_id));
    bytes.extend_from_slice(&write_le_u32(
        u32::try_from(payload.len()).expect("payload fits in u32"),
    ));
    bytes.push(tag);
    bytes.extend_from_slice(payload);
    bytes
}

fn envelope(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = START_MARKER.to_vec();
    for segment in segments {
        bytes.extend_from_slice(segment);
    }
    bytes.extend_from_slice(&END_MARKER);
    bytes
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut writer = CompressorWriter::new(Vec::new(), 4096, 5, 22);
    writer.write_all(data).expect("compress payload");
    writer.into_inner()
}

#[test]
fn empty_buffer_yields_nothing() {
    let (segments, stats) = extract_with_stats(&[]);

    assert!(segments.is_empty());
    assert_eq!(stats, ExtractStats::default());
}

#[test]
fn segments_from_consecutive_envelopes_keep_their_order() {
    let mut buffer = vec![0x11, 0x22, 0x68, 0x27];
    buffer.extend(envelope(&[segment(7, 0, b"one"), segment(8, 0, b"two")]));
    buffer.extend_from_slice(&[0xe3, 0x27, 0x00]);
    buffer.extend(envelope(&[segment(9, 0, b"three")]));

    let (segments, stats) = extract_with_stats(&buffer);

    let seen: Vec<_> = segments.iter().map(|s| (s.type_id, s.content())).collect();
    assert_eq!(
        seen,
        vec![(7, &b"one"[..]), (8, &b"two"[..]), (9, &b"three"[..])]
    );
    assert_eq!(stats.envelopes, 2);
    assert_eq!(stats.segments, 3);
    assert!(segments.iter().all(|s| matches!(s.content, Cow::Borrowed(_))));
}

#[test]
fn zero_type_ends_the_envelope_but_not_the_scan() {
    let mut buffer = envelope(&[segment(7, 0, b"kept"), segment(0, 0, b""), segment(8, 0, b"lost")]);
    buffer.extend(envelope(&[segment(9, 0, b"next")]));

    let segments = extract(&buffer);

    let types: Vec<_> = segments.iter().map(|s| s.type_id).collect();
    assert_eq!(types, vec![7, 9]);
}

#[test]
fn payload_crossing_the_end_marker_stops_the_envelope() {
    let mut overlong = segment(8, 0, b"ab");
    overlong[4] = 200;
    let mut buffer = envelope(&[segment(7, 0, b"first"), overlong]);
    buffer.extend(envelope(&[segment(9, 0, b"after")]));

    let (segments, stats) = extract_with_stats(&buffer);

    let types: Vec<_> = segments.iter().map(|s| s.type_id).collect();
    assert_eq!(types, vec![7, 9]);
    assert_eq!(stats.truncated, 1);
}

#[test]
fn partial_header_before_the_end_marker_is_truncation() {
    let mut body = segment(7, 0, b"x");
    body.extend_from_slice(&[1, 2, 3]);
    let buffer = envelope(&[body]);

    let (segments, stats) = extract_with_stats(&buffer);

    assert_eq!(segments.len(), 1);
    assert_eq!(stats.truncated, 1);
}

#[test]
fn start_marker_without_end_marker_yields_nothing() {
    let mut buffer = START_MARKER.to_vec();
    buffer.extend(segment(7, 0, b"orphan"));

    let (segments, stats) = extract_with_stats(&buffer);

    assert!(segments.is_empty());
    assert_eq!(stats.envelopes, 0);
}

#[rstest]
#[case::two(2)]
#[case::max(u8::MAX)]
fn unknown_encoding_skips_only_that_segment(#[case] tag: u8) {
    let buffer = envelope(&[
        segment(7, 0, b"before"),
        segment(8, tag, b"opaque"),
        segment(9, 0, b"after"),
    ]);

    let (segments, stats) = extract_with_stats(&buffer);

    let types: Vec<_> = segments.iter().map(|s| s.type_id).collect();
    assert_eq!(types, vec![7, 9]);
    assert_eq!(stats.unsupported_encodings, 1);
}

#[test]
fn brotli_payloads_are_inflated() {
    let plain = b"compressed combat payload ".repeat(8);
    let buffer = envelope(&[segment(10_308, 1, &compress(&plain))]);

    let segments = extract(&buffer);

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].encoding, Encoding::Brotli);
    assert_eq!(segments[0].content(), plain.as_slice());
    assert!(matches!(segments[0].content, Cow::Owned(_)));
}

#[test]
fn failed_inflation_drops_only_that_segment() {
    let compressed = compress(&b"never fully delivered".repeat(16));
    let broken = &compressed[..compressed.len() / 2];
    let buffer = envelope(&[segment(7, 1, broken), segment(9, 0, b"after")]);

    let (segments, stats) = extract_with_stats(&buffer);

    let types: Vec<_> = segments.iter().map(|s| s.type_id).collect();
    assert_eq!(types, vec![9]);
    assert_eq!(stats.inflate_failures, 1);
}

#[test]
fn inflation_is_capped() {
    let bomb = compress(&vec![0_u8; MAX_INFLATED_LEN + 1]);

    let err = inflate(&bomb).expect_err("output above the cap");

    assert!(matches!(err, InflateError::TooLarge { limit } if limit == MAX_INFLATED_LEN));
}

#[test]
fn inflation_at_the_cap_succeeds() {
    let exact = compress(&vec![7_u8; MAX_INFLATED_LEN]);

    assert_eq!(inflate(&exact).expect("within cap").len(), MAX_INFLATED_LEN);
}

#[rstest]
#[case::raw(0, Some(Encoding::Raw))]
#[case::brotli(1, Some(Encoding::Brotli))]
#[case::unknown(2, None)]
fn encoding_tags(#[case] tag: u8, #[case] expected: Option<Encoding>) {
    assert_eq!(Encoding::from_tag(tag), expected);
    if let Some(encoding) = expected {
        assert_eq!(encoding.tag(), tag);
    }
}

prop_compose! {
    fn raw_segments()
        (
            parts in proptest::collection::vec(
                (1_u32..0x60, proptest::collection::vec(0_u8..0x60, 0..64)),
                0..8,
            )
        ) -> Vec<(u32, Vec<u8>)> {
            parts
        }
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(buffer in proptest::collection::vec(any::<u8>(), 0..512)) {
        let (segments, stats) = extract_with_stats(&buffer);
        prop_assert_eq!(segments.len(), stats.segments);
        for segment in &segments {
            prop_assert!(segment.type_id != 0);
        }
    }

    #[test]
    fn well_formed_envelopes_yield_every_segment(parts in raw_segments()) {
        let encoded: Vec<_> = parts
            .iter()
            .map(|(type_id, payload)| segment(*type_id, 0, payload))
            .collect();
        let buffer = envelope(&encoded);

        let segments = extract(&buffer);

        let seen: Vec<_> = segments
            .iter()
            .map(|s| (s.type_id, s.content().to_vec()))
            .collect();
        prop_assert_eq!(seen, parts);
    }
}
