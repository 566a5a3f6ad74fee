//! Log output for malformed traffic.
//!
//! Decode failures must name the segment type and length so protocol drift
//! can be diagnosed from logs alone.

use std::time::SystemTime;

use bytes::Bytes;
use combat_dissector::{
    Dissector,
    reassembly::{Boundary, FlowKey, ReassembledChunk},
    record::{ATTACK_TYPE, HP_TYPE, ITEM_TYPES},
};
use dissector_testing::{LoggerHandle, envelope, hp_payload, logger, segment};
use rstest::rstest;
use serial_test::serial;

fn chunk(bytes: Vec<u8>) -> ReassembledChunk {
    ReassembledChunk {
        flow: FlowKey::new(
            "10.0.0.1:16000".parse().expect("server addr"),
            "10.0.0.2:50000".parse().expect("client addr"),
        ),
        bytes: Bytes::from(bytes),
        boundary: Boundary::Push,
        captured_at: SystemTime::UNIX_EPOCH,
    }
}

#[rstest]
#[case::short_attack(segment(ATTACK_TYPE, &[0; 12]), "type_id=10308, len=12")]
#[case::short_hp(segment(HP_TYPE, &[0; 19]), "type_id=100178, len=19")]
#[case::empty_item(segment(ITEM_TYPES[1], &[]), "type_id=100322, len=0")]
#[serial]
fn decode_failures_are_logged_with_type_and_length(
    mut logger: LoggerHandle,
    #[case] bad: Vec<u8>,
    #[case] expected: &str,
) {
    let mut dissector = Dissector::new();

    let records = dissector.dissect(&chunk(envelope(&[bad, segment(HP_TYPE, &hp_payload(1, 2, 1))])));

    assert_eq!(records.len(), 1, "the valid sibling still decodes");
    let warnings: Vec<_> = logger
        .messages()
        .into_iter()
        .filter(|(level, _)| *level == log::Level::Warn)
        .map(|(_, message)| message)
        .collect();
    assert!(
        warnings.iter().any(|m| m.contains("segment decode failed") && m.contains(expected)),
        "expected a warning containing {expected:?}, got {warnings:?}"
    );
}

#[rstest]
#[serial]
fn unknown_types_do_not_warn(mut logger: LoggerHandle) {
    let mut dissector = Dissector::new();

    let records = dissector.dissect(&chunk(envelope(&[segment(10_299, b"experimental")])));

    assert!(records.is_empty());
    assert!(
        logger
            .messages()
            .iter()
            .all(|(level, _)| *level > log::Level::Warn)
    );
}
