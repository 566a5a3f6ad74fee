//! Async side of the pump: the only owner of reassembly state.

use std::time::SystemTime;

use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::PumpStats;
use crate::{
    config::SnifferConfig,
    dissect::Dissector,
    metrics,
    reassembly::{Assembler, CapturedSegment, ReassembledChunk, ReassemblyLimits},
    sink::RecordSink,
};

/// Reassembly, dissection and flush scheduling for one capture.
///
/// Live captures flush on a wall-clock ticker. Replayed captures flush
/// whenever their own capture timeline crosses the next flush interval.
#[derive(Debug)]
pub(super) struct Engine {
    assembler: Assembler,
    dissector: Dissector,
    config: SnifferConfig,
    live: bool,
    latest: Option<SystemTime>,
    next_flush: Option<SystemTime>,
    segments: usize,
    records: usize,
    flushes: usize,
}

impl Engine {
    pub(super) fn new(config: SnifferConfig, live: bool) -> Self {
        Self {
            assembler: Assembler::new(ReassemblyLimits::from(config.resource_limits())),
            dissector: Dissector::new(),
            config,
            live,
            latest: None,
            next_flush: None,
            segments: 0,
            records: 0,
            flushes: 0,
        }
    }

    pub(super) fn ingest<K: RecordSink>(&mut self, segment: CapturedSegment, sink: &mut K) {
        self.segments += 1;
        if !self.live {
            self.advance_capture_clock(segment.captured_at, sink);
        }
        let chunks = self.assembler.assemble(segment);
        self.deliver(chunks, sink);
    }

    /// Periodic flush against the wall clock.
    pub(super) fn tick<K: RecordSink>(&mut self, sink: &mut K) { self.flush(SystemTime::now(), sink); }

    /// Release everything still buffered and report totals.
    pub(super) fn finish<K: RecordSink>(mut self, sink: &mut K) -> PumpStats {
        let chunks = self.assembler.flush_all();
        self.deliver(chunks, sink);
        PumpStats {
            segments: self.segments,
            records: self.records,
            flushes: self.flushes,
            assembler: self.assembler.stats(),
            dissector: self.dissector.stats(),
        }
    }

    fn advance_capture_clock<K: RecordSink>(&mut self, at: SystemTime, sink: &mut K) {
        let latest = self.latest.map_or(at, |latest| latest.max(at));
        self.latest = Some(latest);
        let period = self.config.flush_period();
        let due = *self.next_flush.get_or_insert(latest + period);
        if latest >= due {
            self.flush(latest, sink);
            self.next_flush = Some(latest + period);
        }
    }

    fn flush<K: RecordSink>(&mut self, now: SystemTime, sink: &mut K) {
        self.flushes += 1;
        let chunks = self
            .assembler
            .flush_with_options(self.config.flush_options(now));
        self.deliver(chunks, sink);
    }

    fn deliver<K: RecordSink>(&mut self, chunks: Vec<ReassembledChunk>, sink: &mut K) {
        for chunk in chunks {
            metrics::inc_chunks(chunk.boundary);
            for record in self.dissector.dissect(&chunk) {
                self.records += 1;
                sink.deliver(record);
            }
        }
    }
}

/// Race cancellation, the flush ticker and incoming segments until
/// cancelled or the reader hangs up, then drain.
pub(super) async fn run_worker<K: RecordSink>(
    mut rx: mpsc::Receiver<CapturedSegment>,
    mut sink: K,
    mut engine: Engine,
    cancel: CancellationToken,
) -> (K, PumpStats) {
    let period = engine.config.flush_period();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let live = engine.live;

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            _ = ticker.tick(), if live => engine.tick(&mut sink),

            segment = rx.recv() => match segment {
                Some(segment) => engine.ingest(segment, &mut sink),
                None => break,
            },
        }
    }

    drop(rx);
    let stats = engine.finish(&mut sink);
    (sink, stats)
}
