//! Blocking side of the pump: pulls packets off the source.

use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    capture::{CaptureError, PacketSource, SourceEvent},
    metrics,
    reassembly::CapturedSegment,
};

/// Pause after a source reports nothing to read.
pub(super) const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// What the reader hands back when it stops.
#[derive(Debug)]
pub(super) struct ReaderOutcome<S> {
    pub source: S,
    pub error: Option<CaptureError>,
}

/// Forward segments from `source` until it is exhausted, it fails, the
/// worker goes away or `cancel` fires.
///
/// Cancellation is checked between reads, so a source's read timeout
/// bounds how long shutdown waits on the reader. An idle source is polled
/// again after [`IDLE_BACKOFF`].
pub(super) fn read_packets<S: PacketSource>(
    mut source: S,
    tx: &mpsc::Sender<CapturedSegment>,
    cancel: &CancellationToken,
) -> ReaderOutcome<S> {
    let mut error = None;
    while !cancel.is_cancelled() {
        match source.next_event() {
            Ok(SourceEvent::Segment(segment)) => {
                metrics::inc_segments();
                if tx.blocking_send(segment).is_err() {
                    debug!("worker gone, reader stopping");
                    break;
                }
            }
            Ok(SourceEvent::Skipped) => {}
            Ok(SourceEvent::Idle) => std::thread::sleep(IDLE_BACKOFF),
            Ok(SourceEvent::Exhausted) => {
                debug!("packet source exhausted");
                break;
            }
            Err(e) => {
                tracing::error!(error = %e, "packet source failed");
                error = Some(e);
                break;
            }
        }
    }
    ReaderOutcome { source, error }
}
