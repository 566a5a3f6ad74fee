//! Multi-flow TCP reassembly with page budgets and timed flushing.

use std::collections::HashMap;

use log::debug;

use super::{
    CapturedSegment,
    ConnectionState,
    FlowKey,
    FlushOptions,
    ReassembledChunk,
    ReassemblyLimits,
    connection::Placement,
};
use crate::metrics;

/// Running totals kept by an [`Assembler`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    /// Segments accepted.
    pub segments: usize,
    /// Segments or pages whose bytes had already been delivered.
    pub retransmits: usize,
    /// Segments buffered as out-of-order pages.
    pub out_of_order: usize,
    /// Buffered pages discarded to honour a page budget.
    pub evicted_pages: usize,
    /// Incoming pages refused because their flow had nothing to evict.
    pub refused_pages: usize,
    /// Sequence space skipped over gaps during forced delivery.
    pub skipped_bytes: usize,
    /// Chunks released.
    pub chunks: usize,
    /// Flows closed by FIN, RST, flush or shutdown.
    pub closed_flows: usize,
}

/// Reassembles captured TCP segments into contiguous per-flow chunks.
///
/// Out-of-order segments, and every segment of a flow joined mid-stream
/// before its start is known, are held as pages under two budgets: one
/// across all flows and one per flow. A chunk is released once the last segment
/// applied to it carried a PUSH, or when a flush or close forces it out.
///
/// # Examples
///
/// ```
/// use std::time::SystemTime;
///
/// use bytes::Bytes;
/// use combat_dissector::reassembly::{Assembler, CapturedSegment, FlowKey, TcpFlags};
///
/// let flow = FlowKey::new(
///     "10.0.0.1:16000".parse().expect("address"),
///     "10.0.0.2:50000".parse().expect("address"),
/// );
/// let segment = |seq, payload: &'static [u8], flags| CapturedSegment {
///     flow,
///     seq,
///     flags,
///     captured_at: SystemTime::UNIX_EPOCH,
///     payload: Bytes::from_static(payload),
/// };
///
/// let syn = TcpFlags { syn: true, ..TcpFlags::default() };
///
/// let mut assembler = Assembler::default();
/// assembler.assemble(segment(99, b"", syn));
/// assert!(assembler.assemble(segment(106, b"world", TcpFlags::push())).is_empty());
/// let chunks = assembler.assemble(segment(100, b"hello ", TcpFlags::data()));
/// assert_eq!(chunks[0].bytes.as_ref(), b"hello world");
/// ```
#[derive(Debug, Default)]
pub struct Assembler {
    limits: ReassemblyLimits,
    flows: HashMap<FlowKey, ConnectionState>,
    pages_in_use: usize,
    arrivals: u64,
    stats: AssemblerStats,
}

impl Assembler {
    /// Create an assembler enforcing `limits`.
    #[must_use]
    pub fn new(limits: ReassemblyLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Configured page budgets.
    #[must_use]
    pub fn limits(&self) -> ReassemblyLimits { self.limits }

    /// Totals since construction.
    #[must_use]
    pub fn stats(&self) -> AssemblerStats { self.stats }

    /// Number of flows currently tracked.
    #[must_use]
    pub fn flow_count(&self) -> usize { self.flows.len() }

    /// Pages buffered across all flows.
    #[must_use]
    pub fn pages_in_use(&self) -> usize { self.pages_in_use }

    /// State held for `flow`, if tracked.
    #[must_use]
    pub fn connection(&self, flow: &FlowKey) -> Option<&ConnectionState> { self.flows.get(flow) }

    /// Feed one captured segment and collect the chunks it releases.
    ///
    /// Segments with neither payload nor a SYN are only used to close a
    /// tracked flow on FIN or RST.
    pub fn assemble(&mut self, segment: CapturedSegment) -> Vec<ReassembledChunk> {
        let mut out = Vec::new();
        self.stats.segments += 1;

        if !self.flows.contains_key(&segment.flow) {
            if segment.payload.is_empty() && !segment.flags.syn {
                return out;
            }
            self.flows.insert(
                segment.flow,
                ConnectionState::new(segment.flow, segment.captured_at),
            );
            metrics::set_tracked_flows(self.flows.len());
        }
        let Some(state) = self.flows.get_mut(&segment.flow) else {
            return out;
        };
        state.touch(segment.captured_at);

        match state.place(&segment, &mut self.stats, &mut out) {
            Placement::Delivered { released } => {
                self.pages_in_use = self.pages_in_use.saturating_sub(released);
            }
            Placement::Duplicate => self.stats.retransmits += 1,
            Placement::OutOfOrder(page) => {
                self.stats.out_of_order += 1;
                let per_flow_full = state.page_count() >= self.limits.pages_per_connection().get();
                let total_full = self.pages_in_use >= self.limits.total_pages().get();
                if per_flow_full || total_full {
                    if let Some(dropped) = state.evict_oldest() {
                        self.pages_in_use = self.pages_in_use.saturating_sub(1);
                        self.stats.evicted_pages += 1;
                        metrics::inc_evicted_pages();
                        debug!(
                            "page budget exceeded, evicted oldest page: flow={}, bytes={dropped}",
                            segment.flow
                        );
                    } else {
                        self.stats.refused_pages += 1;
                        metrics::inc_evicted_pages();
                        debug!(
                            "page budget exceeded, refused page: flow={}, bytes={}",
                            segment.flow,
                            page.len()
                        );
                        return self.finish(segment, out);
                    }
                }
                self.arrivals += 1;
                state.buffer(page, self.arrivals);
                self.pages_in_use += 1;
            }
            Placement::Empty => {}
        }

        self.finish(segment, out)
    }

    fn finish(
        &mut self,
        segment: CapturedSegment,
        mut out: Vec<ReassembledChunk>,
    ) -> Vec<ReassembledChunk> {
        if segment.flags.closes() {
            self.close(&segment.flow, &mut out);
        }
        self.stats.chunks += out.len();
        out
    }

    /// Flush flows according to `options`.
    ///
    /// Flows idle since before `options.close_before` are closed with all
    /// of their data released. Flows holding data captured before
    /// `options.flush_before` have it released across any gaps and stay
    /// open.
    pub fn flush_with_options(&mut self, options: FlushOptions) -> Vec<ReassembledChunk> {
        let mut out = Vec::new();
        let idle: Vec<FlowKey> = self
            .flows
            .values()
            .filter(|state| state.last_seen() < options.close_before)
            .map(ConnectionState::flow)
            .collect();
        for flow in &idle {
            self.close(flow, &mut out);
        }

        for state in self.flows.values_mut() {
            if state
                .oldest_data()
                .is_some_and(|oldest| oldest < options.flush_before)
            {
                let released = state.force_deliver(true, &mut self.stats, &mut out);
                self.pages_in_use = self.pages_in_use.saturating_sub(released);
            }
        }

        if !idle.is_empty() {
            debug!("flush closed idle flows: closed={}, open={}", idle.len(), self.flows.len());
        }
        self.stats.chunks += out.len();
        out
    }

    /// Close every flow, releasing all buffered data.
    pub fn flush_all(&mut self) -> Vec<ReassembledChunk> {
        let mut out = Vec::new();
        let flows: Vec<FlowKey> = self.flows.keys().copied().collect();
        for flow in &flows {
            self.close(flow, &mut out);
        }
        self.stats.chunks += out.len();
        out
    }

    fn close(&mut self, flow: &FlowKey, out: &mut Vec<ReassembledChunk>) {
        let Some(mut state) = self.flows.remove(flow) else {
            return;
        };
        let released = state.force_deliver(true, &mut self.stats, out);
        self.pages_in_use = self.pages_in_use.saturating_sub(released);
        self.stats.closed_flows += 1;
        metrics::set_tracked_flows(self.flows.len());
    }
}
