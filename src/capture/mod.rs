//! Packet sources feeding the capture pump.
//!
//! A [`PacketSource`] yields one [`SourceEvent`] per call. Sources block
//! for at most a bounded interval so the pump's reader can notice
//! cancellation between calls: live sources report [`SourceEvent::Idle`]
//! when their read timeout elapses.

pub mod error;
pub mod filter;
pub mod link;
#[cfg(feature = "live")]
pub mod live;
pub mod replay;

use std::collections::VecDeque;

pub use error::CaptureError;
pub use filter::{DEFAULT_PORT, PortFilter};
pub use link::{LinkType, decode_frame};
#[cfg(feature = "live")]
pub use live::LiveSource;
pub use replay::ReplaySource;

use crate::reassembly::CapturedSegment;

/// Outcome of one read from a [`PacketSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceEvent {
    /// A TCP segment matching the source's filter.
    Segment(CapturedSegment),
    /// A packet was read but is not relevant TCP traffic.
    Skipped,
    /// No packet arrived within the read timeout.
    Idle,
    /// The source has no more packets.
    Exhausted,
}

/// A blocking supplier of captured TCP segments.
pub trait PacketSource: Send + 'static {
    /// Read the next event.
    ///
    /// Implementations must return within a bounded time, yielding
    /// [`SourceEvent::Idle`] when nothing arrived.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] when the underlying capture fails.
    fn next_event(&mut self) -> Result<SourceEvent, CaptureError>;

    /// Whether packets arrive in real time.
    ///
    /// Live sources age connections by the wall clock; replayed sources age
    /// them by capture timestamps.
    fn is_live(&self) -> bool;
}

impl PacketSource for Box<dyn PacketSource> {
    fn next_event(&mut self) -> Result<SourceEvent, CaptureError> { (**self).next_event() }

    fn is_live(&self) -> bool { (**self).is_live() }
}

/// Replays segments already held in memory.
///
/// Useful when segments come from another capture library, and in tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    events: VecDeque<SourceEvent>,
    live: bool,
}

impl MemorySource {
    /// Replay `segments` in order, then report exhaustion.
    #[must_use]
    pub fn new(segments: impl IntoIterator<Item = CapturedSegment>) -> Self {
        Self::from_events(segments.into_iter().map(SourceEvent::Segment))
    }

    /// Replay arbitrary events in order, then report exhaustion.
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = SourceEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            live: false,
        }
    }

    /// Report the source as live. Once drained it idles instead of
    /// reporting exhaustion.
    #[must_use]
    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }
}

impl PacketSource for MemorySource {
    fn next_event(&mut self) -> Result<SourceEvent, CaptureError> {
        Ok(self.events.pop_front().unwrap_or(if self.live {
            SourceEvent::Idle
        } else {
            SourceEvent::Exhausted
        }))
    }

    fn is_live(&self) -> bool { self.live }
}

#[cfg(test)]
mod tests;
