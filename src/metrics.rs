//! Metric helpers for `combat-dissector`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature every helper is a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::reassembly::Boundary;

/// Name of the gauge tracking flows held by the assembler.
pub const FLOWS_TRACKED: &str = "combat_dissector_flows_tracked";
/// Name of the counter tracking captured TCP segments.
pub const SEGMENTS_CAPTURED: &str = "combat_dissector_segments_captured_total";
/// Name of the counter tracking chunks released by reassembly.
pub const CHUNKS_REASSEMBLED: &str = "combat_dissector_chunks_reassembled_total";
/// Name of the counter tracking out-of-order pages discarded under pressure.
pub const PAGES_EVICTED: &str = "combat_dissector_pages_evicted_total";
/// Name of the counter tracking decoded records.
pub const RECORDS_DECODED: &str = "combat_dissector_records_decoded_total";
/// Name of the counter tracking segments that failed to decode.
pub const DECODE_ERRORS: &str = "combat_dissector_decode_errors_total";

/// Set the tracked flows gauge.
#[cfg_attr(
    not(feature = "metrics"),
    expect(unused_variables, reason = "no recorder without the metrics feature")
)]
pub fn set_tracked_flows(flows: usize) {
    #[cfg(feature = "metrics")]
    {
        #[expect(
            clippy::cast_precision_loss,
            reason = "flow counts stay far below f64 precision"
        )]
        gauge!(FLOWS_TRACKED).set(flows as f64);
    }
}

/// Record a captured segment.
pub fn inc_segments() {
    #[cfg(feature = "metrics")]
    counter!(SEGMENTS_CAPTURED).increment(1);
}

/// Record a reassembled chunk by how it was released.
#[cfg_attr(
    not(feature = "metrics"),
    expect(unused_variables, reason = "no recorder without the metrics feature")
)]
pub fn inc_chunks(boundary: Boundary) {
    #[cfg(feature = "metrics")]
    {
        let boundary = match boundary {
            Boundary::Push => "push",
            Boundary::Flush => "flush",
        };
        counter!(CHUNKS_REASSEMBLED, "boundary" => boundary).increment(1);
    }
}

/// Record an evicted or refused page.
pub fn inc_evicted_pages() {
    #[cfg(feature = "metrics")]
    counter!(PAGES_EVICTED).increment(1);
}

/// Record a decoded record of the given kind.
#[cfg_attr(
    not(feature = "metrics"),
    expect(unused_variables, reason = "no recorder without the metrics feature")
)]
pub fn inc_records(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(RECORDS_DECODED, "record" => kind).increment(1);
}

/// Record a segment that failed to decode.
pub fn inc_decode_errors() {
    #[cfg(feature = "metrics")]
    counter!(DECODE_ERRORS).increment(1);
}
