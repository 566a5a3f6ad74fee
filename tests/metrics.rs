#![cfg(feature = "metrics")]
//! Tests for `combat-dissector` metrics helpers.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use std::{
    num::NonZeroUsize,
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use combat_dissector::{
    Dissector,
    metrics::{DECODE_ERRORS, FLOWS_TRACKED, PAGES_EVICTED, RECORDS_DECODED},
    reassembly::{
        Assembler,
        Boundary,
        CapturedSegment,
        FlowKey,
        ReassembledChunk,
        ReassemblyLimits,
        TcpFlags,
    },
    record::{ATTACK_TYPE, HP_TYPE},
};
use dissector_testing::{envelope, hp_payload, segment};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn flow() -> FlowKey {
    FlowKey::new(
        "10.0.0.1:16000".parse().expect("server addr"),
        "10.0.0.2:50000".parse().expect("client addr"),
    )
}

fn data(seq: u32, payload: &'static [u8]) -> CapturedSegment {
    CapturedSegment {
        flow: flow(),
        seq,
        flags: TcpFlags {
            ack: true,
            ..TcpFlags::default()
        },
        captured_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
        payload: Bytes::from_static(payload),
    }
}

fn syn(seq: u32) -> CapturedSegment {
    CapturedSegment {
        flags: TcpFlags {
            syn: true,
            ..TcpFlags::default()
        },
        payload: Bytes::new(),
        ..data(seq, b"")
    }
}

fn assert_counter_eq(snapshotter: &Snapshotter, name: &str, expected: u64) {
    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == name && matches!(value, DebugValue::Counter(c) if *c == expected)
        }),
        "expected {name} == {expected}, got {metrics:#?}"
    );
}

fn gauge_value(snapshotter: &Snapshotter, name: &str) -> Option<f64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(key, _, _, value)| match value {
            DebugValue::Gauge(gauge) if key.key().name() == name => Some(gauge.into_inner()),
            _ => None,
        })
}

#[test]
fn dissection_counts_records_by_kind_and_failures() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let chunk = ReassembledChunk {
        flow: flow(),
        bytes: Bytes::from(envelope(&[
            segment(HP_TYPE, &hp_payload(1, 5, 4)),
            segment(ATTACK_TYPE, &[0; 3]),
        ])),
        boundary: Boundary::Push,
        captured_at: SystemTime::UNIX_EPOCH,
    };

    metrics::with_local_recorder(&recorder, || {
        Dissector::new().dissect(&chunk);
    });

    let metrics = snapshotter.snapshot().into_vec();
    let found = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == RECORDS_DECODED
            && k.key()
                .labels()
                .any(|l| l.key() == "record" && l.value() == "hp")
            && matches!(v, DebugValue::Counter(1))
    });
    assert!(found, "hp record metric not recorded");
    let errors = metrics.iter().any(|(k, _, _, v)| {
        k.key().name() == DECODE_ERRORS && matches!(v, DebugValue::Counter(1))
    });
    assert!(errors, "decode error metric not recorded");
}

#[rstest]
#[case(1)]
#[case(3)]
fn evicted_pages_are_counted(#[case] extra_pages: u32) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let one = NonZeroUsize::MIN;
    let mut assembler = Assembler::new(ReassemblyLimits::new(one, one));

    metrics::with_local_recorder(&recorder, || {
        assembler.assemble(syn(99));
        assembler.assemble(data(100, b"head"));
        for page in 0..=extra_pages {
            assembler.assemble(data(200 + page * 10, b"gap"));
        }
    });

    assert_counter_eq(&snapshotter, PAGES_EVICTED, u64::from(extra_pages));
}

#[test]
fn tracked_flows_gauge_follows_the_assembler() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let mut assembler = Assembler::default();

    metrics::with_local_recorder(&recorder, || {
        assembler.assemble(data(1, b"hello"));
    });
    let open = gauge_value(&snapshotter, FLOWS_TRACKED);
    metrics::with_local_recorder(&recorder, || {
        assembler.flush_all();
    });
    let closed = gauge_value(&snapshotter, FLOWS_TRACKED);

    assert_eq!(open, Some(1.0));
    assert_eq!(closed, Some(0.0));
}
