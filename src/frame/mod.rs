//! Envelope scanning for reassembled game traffic.
//!
//! Application data travels inside envelopes bounded by a fixed start and
//! end marker. Between the markers sits a run of segments, each introduced by
//! a 9-byte header carrying a little-endian type ID, a little-endian payload
//! length and a one-byte encoding tag. [`extract`] walks every envelope in a
//! buffer and yields the segments it can read, inflating compressed payloads
//! on the way.

pub mod extract;
pub mod inflate;

use std::borrow::Cow;

pub use extract::{ExtractStats, extract, extract_with_stats};
pub use inflate::{InflateError, MAX_INFLATED_LEN, inflate};

/// Marker opening an envelope.
pub const START_MARKER: [u8; 9] = [0x68, 0x27, 0, 0, 0, 0, 0, 0, 0];

/// Marker closing an envelope.
pub const END_MARKER: [u8; 9] = [0xe3, 0x27, 0, 0, 0, 0, 0, 0, 0];

/// Size of the header preceding each segment payload.
pub const SEGMENT_HEADER_LEN: usize = 9;

/// Payload encoding declared in a segment header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Payload bytes are used as they are.
    Raw,
    /// Payload is a Brotli stream.
    Brotli,
}

impl Encoding {
    /// Map a header encoding tag to an [`Encoding`].
    ///
    /// Returns `None` for tags this dissector does not understand.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Raw),
            1 => Some(Self::Brotli),
            _ => None,
        }
    }

    /// Header tag for this encoding.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Brotli => 1,
        }
    }
}

/// A segment read from an envelope.
///
/// Raw payloads borrow from the scanned buffer; inflated payloads are owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSegment<'a> {
    pub type_id: u32,
    pub encoding: Encoding,
    pub content: Cow<'a, [u8]>,
}

impl FrameSegment<'_> {
    /// Payload bytes, inflated where the header asked for it.
    #[must_use]
    pub fn content(&self) -> &[u8] { &self.content }
}

#[cfg(test)]
mod tests;
