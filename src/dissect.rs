//! Turning reassembled chunks into combat records.

use std::time::SystemTime;

use log::{trace, warn};
use serde::Serialize;

use crate::{
    frame,
    metrics,
    reassembly::{FlowKey, ReassembledChunk},
    record::{self, DecodedRecord},
};

/// A decoded record tagged with the connection it was seen on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SniffedRecord {
    pub flow: FlowKey,
    /// Capture time of the segment that completed the chunk.
    pub captured_at: SystemTime,
    pub record: DecodedRecord,
}

/// Running totals kept by a [`Dissector`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DissectStats {
    pub chunks: usize,
    pub envelopes: usize,
    pub segments: usize,
    pub records: usize,
    pub decode_errors: usize,
    pub unknown_types: usize,
    pub truncated_envelopes: usize,
    pub dropped_segments: usize,
}

/// Runs envelope extraction and segment decoding over chunks.
#[derive(Debug, Default)]
pub struct Dissector {
    stats: DissectStats,
}

impl Dissector {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn stats(&self) -> DissectStats { self.stats }

    /// Decode every known segment in `chunk`, in stream order.
    ///
    /// Segments that fail to decode are logged with their type ID and
    /// length and skipped; the remaining segments are still decoded.
    pub fn dissect(&mut self, chunk: &ReassembledChunk) -> Vec<SniffedRecord> {
        self.stats.chunks += 1;
        let (segments, extracted) = frame::extract_with_stats(&chunk.bytes);
        self.stats.envelopes += extracted.envelopes;
        self.stats.segments += extracted.segments;
        self.stats.truncated_envelopes += extracted.truncated;
        self.stats.dropped_segments += extracted.unsupported_encodings + extracted.inflate_failures;

        let mut out = Vec::new();
        for segment in &segments {
            let content = segment.content();
            match record::decode_segment(segment.type_id, content) {
                Some(Ok(record)) => {
                    self.stats.records += 1;
                    metrics::inc_records(record.kind());
                    out.push(SniffedRecord {
                        flow: chunk.flow,
                        captured_at: chunk.captured_at,
                        record,
                    });
                }
                Some(Err(e)) => {
                    self.stats.decode_errors += 1;
                    metrics::inc_decode_errors();
                    warn!(
                        "segment decode failed: flow={}, type_id={}, len={}, error={e}",
                        chunk.flow,
                        segment.type_id,
                        content.len()
                    );
                }
                None => {
                    self.stats.unknown_types += 1;
                    trace!(
                        "ignoring unknown segment type: type_id={}, len={}",
                        segment.type_id,
                        content.len()
                    );
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    //! Tests for chunk dissection.

    use std::time::{Duration, SystemTime};

    use bytes::Bytes;
    use dissector_testing::{attack_payload, brotli_segment, envelope, hp_payload, segment};

    use super::*;
    use crate::{
        reassembly::Boundary,
        record::{ATTACK_TYPE, HP_TYPE, ITEM_TYPES},
    };

    fn chunk(bytes: Vec<u8>) -> ReassembledChunk {
        ReassembledChunk {
            flow: FlowKey::new(
                "10.0.0.1:16000".parse().expect("addr"),
                "10.0.0.2:50000".parse().expect("addr"),
            ),
            bytes: Bytes::from(bytes),
            boundary: Boundary::Push,
            captured_at: SystemTime::UNIX_EPOCH + Duration::from_secs(5),
        }
    }

    #[test]
    fn records_keep_stream_order_and_chunk_context() {
        let data = chunk(envelope(&[
            segment(HP_TYPE, &hp_payload(9, 100, 70)),
            brotli_segment(ATTACK_TYPE, &attack_payload(1, 9, 2, 3, [1, 0, 0, 0, 0, 0, 0])),
            segment(ITEM_TYPES[0], b"potion"),
        ]));
        let mut dissector = Dissector::new();

        let records = dissector.dissect(&data);

        let kinds: Vec<_> = records.iter().map(|r| r.record.kind()).collect();
        assert_eq!(kinds, ["hp", "attack", "item"]);
        assert!(records.iter().all(|r| r.flow == data.flow));
        assert!(records.iter().all(|r| r.captured_at == data.captured_at));
        assert_eq!(dissector.stats().records, 3);
    }

    #[test]
    fn decode_failures_skip_only_the_bad_segment() {
        let data = chunk(envelope(&[
            segment(ATTACK_TYPE, &[0; 12]),
            segment(HP_TYPE, &hp_payload(4, 10, 4)),
        ]));
        let mut dissector = Dissector::new();

        let records = dissector.dissect(&data);

        assert_eq!(records.len(), 1);
        let DecodedRecord::Hp(hp) = &records[0].record else {
            panic!("expected an HP record");
        };
        assert_eq!(hp.damage, 6);
        assert_eq!(dissector.stats().decode_errors, 1);
    }

    #[test]
    fn unknown_types_are_counted_not_decoded() {
        let data = chunk(envelope(&[segment(10_299, &[1, 2, 3])]));
        let mut dissector = Dissector::new();

        assert!(dissector.dissect(&data).is_empty());
        assert_eq!(dissector.stats().unknown_types, 1);
        assert_eq!(dissector.stats().segments, 1);
    }

    #[test]
    fn flush_chunks_are_dissected_like_push_chunks() {
        let flushed = ReassembledChunk {
            boundary: Boundary::Flush,
            ..chunk(envelope(&[segment(HP_TYPE, &hp_payload(3, 50, 20))]))
        };
        let mut dissector = Dissector::new();

        let records = dissector.dissect(&flushed);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.kind(), "hp");
    }

    #[test]
    fn chunks_without_envelopes_yield_nothing() {
        let mut dissector = Dissector::new();

        assert!(dissector.dissect(&chunk(b"keepalive".to_vec())).is_empty());
        assert_eq!(dissector.stats().chunks, 1);
        assert_eq!(dissector.stats().envelopes, 0);
    }
}
