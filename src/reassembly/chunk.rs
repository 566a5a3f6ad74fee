//! Contiguous byte runs released by the assembler.

use std::time::SystemTime;

use bytes::Bytes;

use super::FlowKey;

/// Why a chunk was released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// The last segment applied to the chunk carried the PUSH flag.
    Push,
    /// The chunk was forced out by a flush, a close or a sequence gap.
    ///
    /// Flush chunks are dissected like PUSH chunks, including the piece
    /// released before a skipped gap, so stale data is decoded rather than
    /// dropped.
    Flush,
}

/// A contiguous run of stream bytes for one flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReassembledChunk {
    pub flow: FlowKey,
    pub bytes: Bytes,
    pub boundary: Boundary,
    /// Capture time of the last segment applied to the chunk.
    pub captured_at: SystemTime,
}

impl ReassembledChunk {
    /// Whether the chunk ended on a PUSH boundary.
    #[must_use]
    pub fn is_push(&self) -> bool { self.boundary == Boundary::Push }
}
