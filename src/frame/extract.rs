//! Envelope and segment walking.

use std::borrow::Cow;

use log::debug;

use super::{END_MARKER, Encoding, FrameSegment, SEGMENT_HEADER_LEN, START_MARKER, inflate};
use crate::byte_order::{len_at, u32_at};

/// Counters describing one extraction pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Envelopes with both markers present.
    pub envelopes: usize,
    /// Segments yielded.
    pub segments: usize,
    /// Envelopes abandoned because a header or payload ran past the end
    /// marker.
    pub truncated: usize,
    /// Segments skipped for carrying an unknown encoding tag.
    pub unsupported_encodings: usize,
    /// Compressed segments dropped because inflation failed.
    pub inflate_failures: usize,
}

/// Extract every readable segment from `buffer`.
///
/// See [`extract_with_stats`] for the scanning rules.
///
/// # Examples
///
/// ```
/// use combat_dissector::frame::{END_MARKER, START_MARKER, extract};
///
/// let mut buffer = START_MARKER.to_vec();
/// buffer.extend_from_slice(&[0x44, 0x28, 0, 0, 2, 0, 0, 0, 0, 0xab, 0xcd]);
/// buffer.extend_from_slice(&END_MARKER);
///
/// let segments = extract(&buffer);
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].type_id, 10_308);
/// assert_eq!(segments[0].content(), &[0xab, 0xcd]);
/// ```
#[must_use]
pub fn extract(buffer: &[u8]) -> Vec<FrameSegment<'_>> { extract_with_stats(buffer).0 }

/// Extract every readable segment from `buffer` and report what was seen.
///
/// Scanning looks for a start marker, then for the first end marker after
/// it, and walks the segments in between. A segment with type ID 0 ends the
/// envelope, as does a header or payload that would cross the end marker.
/// Scanning then resumes after the end marker. A start marker without a
/// matching end marker ends the pass.
///
/// Segments with an unknown encoding tag, or whose compressed payload fails
/// to inflate, are skipped without disturbing their neighbours.
#[must_use]
pub fn extract_with_stats(buffer: &[u8]) -> (Vec<FrameSegment<'_>>, ExtractStats) {
    let mut segments = Vec::new();
    let mut stats = ExtractStats::default();
    let mut consumed = 0;

    while let Some((body_start, body_end)) = next_envelope(buffer, consumed) {
        stats.envelopes += 1;
        walk_envelope(&buffer[body_start..body_end], &mut segments, &mut stats);
        consumed = body_end + END_MARKER.len();
    }

    if stats.truncated > 0 || stats.unsupported_encodings > 0 || stats.inflate_failures > 0 {
        debug!(
            "envelope scan skipped data: envelopes={}, segments={}, truncated={}, \
             unsupported_encodings={}, inflate_failures={}",
            stats.envelopes,
            stats.segments,
            stats.truncated,
            stats.unsupported_encodings,
            stats.inflate_failures
        );
    }
    (segments, stats)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Locate the body of the next envelope at or after `from`.
fn next_envelope(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let start = from + find(buffer.get(from..)?, &START_MARKER)?;
    let body_start = start + START_MARKER.len();
    let body_end = body_start + find(buffer.get(body_start..)?, &END_MARKER)?;
    Some((body_start, body_end))
}

fn walk_envelope<'a>(
    body: &'a [u8],
    segments: &mut Vec<FrameSegment<'a>>,
    stats: &mut ExtractStats,
) {
    let mut offset = 0;
    while offset < body.len() {
        let header_end = offset + SEGMENT_HEADER_LEN;
        let (Some(type_id), Some(len), Some(&tag)) = (
            u32_at(body, offset),
            len_at(body, offset + 4),
            body.get(offset + 8),
        ) else {
            stats.truncated += 1;
            return;
        };
        if type_id == 0 {
            return;
        }
        let Some(payload) = header_end
            .checked_add(len)
            .and_then(|payload_end| body.get(header_end..payload_end))
        else {
            stats.truncated += 1;
            return;
        };
        offset = header_end + payload.len();

        let Some(encoding) = Encoding::from_tag(tag) else {
            stats.unsupported_encodings += 1;
            continue;
        };
        let content = match encoding {
            Encoding::Raw => Cow::Borrowed(payload),
            Encoding::Brotli => match inflate(payload) {
                Ok(inflated) => Cow::Owned(inflated),
                Err(e) => {
                    debug!("dropping segment: type_id={type_id}, len={len}, error={e}");
                    stats.inflate_failures += 1;
                    continue;
                }
            },
        };
        stats.segments += 1;
        segments.push(FrameSegment {
            type_id,
            encoding,
            content,
        });
    }
}
