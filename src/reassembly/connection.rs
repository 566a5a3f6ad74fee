//! Per-flow reassembly state.

use std::time::SystemTime;

use bytes::{Bytes, BytesMut};

use super::{
    AssemblerStats,
    Boundary,
    CapturedSegment,
    FlowKey,
    ReassembledChunk,
    seq::{seq_add, seq_distance, seq_le, seq_lt},
};

/// An out-of-order segment waiting for its predecessor.
#[derive(Clone, Debug)]
pub(super) struct Page {
    seq: u32,
    bytes: Bytes,
    psh: bool,
    captured_at: SystemTime,
    arrival: u64,
}

impl Page {
    pub(super) fn len(&self) -> usize { self.bytes.len() }

    fn end(&self) -> u32 { seq_add(self.seq, self.bytes.len()) }
}

/// Where an accepted segment ended up.
#[derive(Debug)]
pub(super) enum Placement {
    /// Data joined the contiguous stream. `released` pages were consumed
    /// from the buffer along the way.
    Delivered { released: usize },
    /// Every byte had already been delivered.
    Duplicate,
    /// Data lies beyond a gap and must be buffered.
    OutOfOrder(Page),
    /// No payload to place.
    Empty,
}

/// Reassembly state for one direction of a TCP connection.
///
/// Holds the next expected sequence number, out-of-order pages and bytes
/// delivered in order but still waiting for a PUSH boundary.
#[derive(Debug)]
pub struct ConnectionState {
    flow: FlowKey,
    next_seq: Option<u32>,
    pages: Vec<Page>,
    pending: BytesMut,
    pending_since: Option<SystemTime>,
    last_psh: bool,
    last_applied_at: SystemTime,
    last_seen: SystemTime,
}

impl ConnectionState {
    pub(super) fn new(flow: FlowKey, now: SystemTime) -> Self {
        Self {
            flow,
            next_seq: None,
            pages: Vec::new(),
            pending: BytesMut::new(),
            pending_since: None,
            last_psh: false,
            last_applied_at: now,
            last_seen: now,
        }
    }

    /// Flow this state belongs to.
    #[must_use]
    pub fn flow(&self) -> FlowKey { self.flow }

    /// Sequence number of the next byte expected in order.
    #[must_use]
    pub fn next_seq(&self) -> Option<u32> { self.next_seq }

    /// Number of buffered out-of-order pages.
    #[must_use]
    pub fn page_count(&self) -> usize { self.pages.len() }

    /// Bytes delivered in order but not yet released as a chunk.
    #[must_use]
    pub fn pending_len(&self) -> usize { self.pending.len() }

    /// Capture time of the most recent segment seen on this flow.
    #[must_use]
    pub fn last_seen(&self) -> SystemTime { self.last_seen }

    /// Capture time of the oldest byte still held, if any.
    #[must_use]
    pub fn oldest_data(&self) -> Option<SystemTime> {
        self.pages
            .iter()
            .map(|page| page.captured_at)
            .chain(self.pending_since)
            .min()
    }

    pub(super) fn touch(&mut self, at: SystemTime) {
        if at > self.last_seen {
            self.last_seen = at;
        }
    }

    /// Place a segment's payload relative to the expected sequence number.
    ///
    /// A SYN fixes the initial sequence number. A flow first seen mid-stream
    /// has no start yet: its data is held as pages until a forced delivery
    /// anchors it at the lowest buffered sequence number. Bytes already
    /// delivered are trimmed from the front.
    pub(super) fn place(
        &mut self,
        segment: &CapturedSegment,
        stats: &mut AssemblerStats,
        out: &mut Vec<ReassembledChunk>,
    ) -> Placement {
        let mut seq = segment.data_seq();
        if segment.flags.syn && self.next_seq.is_none() {
            self.next_seq = Some(seq);
            if segment.payload.is_empty() && !self.pages.is_empty() {
                let released = self.drain_contiguous(stats);
                self.release_on_push(out);
                return Placement::Delivered { released };
            }
        }
        if segment.payload.is_empty() {
            return Placement::Empty;
        }
        let mut payload = segment.payload.clone();
        let Some(next) = self.next_seq else {
            return Placement::OutOfOrder(Page {
                seq,
                bytes: payload,
                psh: segment.flags.psh,
                captured_at: segment.captured_at,
                arrival: 0,
            });
        };

        if seq_le(seq_add(seq, payload.len()), next) {
            return Placement::Duplicate;
        }
        if seq_lt(seq, next) {
            payload = payload.slice(seq_distance(seq, next)..);
            seq = next;
        }
        if seq != next {
            return Placement::OutOfOrder(Page {
                seq,
                bytes: payload,
                psh: segment.flags.psh,
                captured_at: segment.captured_at,
                arrival: 0,
            });
        }

        self.apply(payload, segment.flags.psh, segment.captured_at);
        let released = self.drain_contiguous(stats);
        self.release_on_push(out);
        Placement::Delivered { released }
    }

    /// Buffer an out-of-order page, stamped with its arrival order.
    pub(super) fn buffer(&mut self, mut page: Page, arrival: u64) {
        page.arrival = arrival;
        self.pages.push(page);
    }

    /// Discard the earliest-arrived page.
    ///
    /// Returns the number of bytes dropped, or `None` when no page is held.
    pub(super) fn evict_oldest(&mut self) -> Option<usize> {
        let index = self
            .pages
            .iter()
            .enumerate()
            .min_by_key(|(_, page)| page.arrival)
            .map(|(index, _)| index)?;
        Some(self.pages.swap_remove(index).bytes.len())
    }

    /// Deliver every buffered page in sequence order, skipping gaps.
    ///
    /// A flow without a start is anchored at its lowest page first. Bytes on
    /// either side of a gap are released as separate chunks. With
    /// `release_rest` set, bytes still waiting for a PUSH are released as a
    /// [`Boundary::Flush`] chunk at the end. Returns the number of pages
    /// consumed.
    pub(super) fn force_deliver(
        &mut self,
        release_rest: bool,
        stats: &mut AssemblerStats,
        out: &mut Vec<ReassembledChunk>,
    ) -> usize {
        if self.next_seq.is_none() {
            self.next_seq = self.lowest_page_seq();
        }
        let mut released = self.drain_contiguous(stats);
        self.release_on_push(out);

        while let Some(next) = self.next_seq {
            let Some(gap) = self
                .pages
                .iter()
                .map(|page| seq_distance(next, page.seq))
                .min()
            else {
                break;
            };
            stats.skipped_bytes += gap;
            self.release(Boundary::Flush, out);
            self.next_seq = Some(seq_add(next, gap));
            released += self.drain_contiguous(stats);
            self.release_on_push(out);
        }

        if release_rest {
            self.release(Boundary::Flush, out);
        }
        released
    }

    fn lowest_page_seq(&self) -> Option<u32> {
        self.pages
            .iter()
            .map(|page| page.seq)
            .reduce(|lowest, seq| if seq_lt(seq, lowest) { seq } else { lowest })
    }

    fn apply(&mut self, bytes: Bytes, psh: bool, captured_at: SystemTime) {
        let next = self.next_seq.unwrap_or_default();
        self.next_seq = Some(seq_add(next, bytes.len()));
        self.pending.extend_from_slice(&bytes);
        self.pending_since.get_or_insert(captured_at);
        self.last_psh = psh;
        self.last_applied_at = captured_at;
    }

    /// Merge pages that have become contiguous with the delivered prefix.
    fn drain_contiguous(&mut self, stats: &mut AssemblerStats) -> usize {
        let mut released = 0;
        while let Some(next) = self.next_seq {
            let Some(index) = self.pages.iter().position(|page| seq_le(page.seq, next)) else {
                break;
            };
            let page = self.pages.swap_remove(index);
            released += 1;
            if seq_le(page.end(), next) {
                stats.retransmits += 1;
                continue;
            }
            let overlap = seq_distance(page.seq, next);
            self.apply(page.bytes.slice(overlap..), page.psh, page.captured_at);
        }
        released
    }

    fn release_on_push(&mut self, out: &mut Vec<ReassembledChunk>) {
        if self.last_psh {
            self.release(Boundary::Push, out);
        }
    }

    fn release(&mut self, boundary: Boundary, out: &mut Vec<ReassembledChunk>) {
        if self.pending.is_empty() {
            return;
        }
        out.push(ReassembledChunk {
            flow: self.flow,
            bytes: self.pending.split().freeze(),
            boundary,
            captured_at: self.last_applied_at,
        });
        self.pending_since = None;
        self.last_psh = false;
    }
}
