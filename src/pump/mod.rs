//! The capture pump: packet source to record sink.
//!
//! A [`Sniffer`] owns every piece of engine state. Starting it spawns a
//! blocking reader that pulls segments off the [`PacketSource`] into a
//! bounded channel and a worker task that reassembles, dissects and
//! delivers records. The worker is the only writer of reassembly state.
//!
//! The lifecycle is explicit: [`Sniffer::start`], then [`Sniffer::stop`]
//! (cancels and waits for the worker's final drain), then
//! [`Sniffer::close`] (joins the reader and releases the source).

pub mod error;
mod reader;
mod worker;

use std::future::Future;

pub use error::LifecycleError;
use reader::{ReaderOutcome, read_packets};
use tokio::{runtime::Handle, select, sync::mpsc, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use worker::{Engine, run_worker};

use crate::{
    capture::PacketSource,
    config::SnifferConfig,
    dissect::DissectStats,
    error::Result,
    reassembly::AssemblerStats,
    sink::RecordSink,
};

/// Totals reported when a [`Sniffer`] stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Segments received from the reader.
    pub segments: usize,
    /// Records handed to the sink.
    pub records: usize,
    /// Periodic flushes performed.
    pub flushes: usize,
    pub assembler: AssemblerStats,
    pub dissector: DissectStats,
}

struct Running<S, K> {
    cancel: CancellationToken,
    tracker: TaskTracker,
    reader: JoinHandle<ReaderOutcome<S>>,
    worker: JoinHandle<(K, PumpStats)>,
}

enum Phase<S, K> {
    Ready { source: S, sink: K },
    Running(Running<S, K>),
    Stopped {
        reader: JoinHandle<ReaderOutcome<S>>,
        sink: K,
    },
    Closed,
}

impl<S, K> Phase<S, K> {
    fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Running(_) => "running",
            Self::Stopped { .. } => "stopped",
            Self::Closed => "closed",
        }
    }
}

/// Drives a [`PacketSource`] through reassembly and dissection into a
/// [`RecordSink`].
///
/// # Examples
///
/// ```
/// use combat_dissector::{
///     capture::MemorySource,
///     config::SnifferConfig,
///     dissect::SniffedRecord,
///     pump::Sniffer,
///     sizing::ResourceLimits,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), combat_dissector::error::DissectorError> {
/// let config = SnifferConfig::new(ResourceLimits::FALLBACK);
/// let sniffer = Sniffer::new(config, MemorySource::default(), Vec::<SniffedRecord>::new());
/// let (records, stats) = sniffer.run_until(std::future::pending()).await?;
/// assert!(records.is_empty());
/// assert_eq!(stats.segments, 0);
/// # Ok(())
/// # }
/// ```
pub struct Sniffer<S: PacketSource, K: RecordSink> {
    config: SnifferConfig,
    phase: Phase<S, K>,
}

impl<S: PacketSource, K: RecordSink> Sniffer<S, K> {
    /// Create a sniffer that has not started reading yet.
    #[must_use]
    pub fn new(config: SnifferConfig, source: S, sink: K) -> Self {
        Self {
            config,
            phase: Phase::Ready { source, sink },
        }
    }

    #[must_use]
    pub fn config(&self) -> &SnifferConfig { &self.config }

    /// Whether the reader and worker have been spawned and not yet stopped.
    #[must_use]
    pub fn is_running(&self) -> bool { matches!(self.phase, Phase::Running(_)) }

    /// Spawn the reader and worker.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoRuntime`] outside a tokio runtime and
    /// another [`LifecycleError`] unless the sniffer is freshly created.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        if Handle::try_current().is_err() {
            return Err(LifecycleError::NoRuntime);
        }
        let (source, sink) = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Ready { source, sink } => (source, sink),
            other => {
                let err = match other {
                    Phase::Closed => LifecycleError::Closed,
                    Phase::Stopped { .. } => LifecycleError::AlreadyStopped,
                    _ => LifecycleError::AlreadyStarted,
                };
                self.phase = other;
                return Err(err);
            }
        };

        let live = source.is_live();
        let capacity = self.config.resource_limits().buffer_size.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let reader = {
            let cancel = cancel.clone();
            tracker.spawn_blocking(move || read_packets(source, &tx, &cancel))
        };
        let worker = tracker.spawn(run_worker(
            rx,
            sink,
            Engine::new(self.config, live),
            cancel.clone(),
        ));
        tracker.close();

        tracing::info!(
            live,
            port = self.config.filter().port(),
            buffer = capacity,
            "capture pump started"
        );
        self.phase = Phase::Running(Running {
            cancel,
            tracker,
            reader,
            worker,
        });
        Ok(())
    }

    /// Cancel capture and wait for the worker to drain.
    ///
    /// Every buffered byte is flushed through the dissector before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns a [`LifecycleError`] unless the sniffer is running and
    /// [`DissectorError::Task`](crate::error::DissectorError::Task) if the
    /// worker panicked.
    pub async fn stop(&mut self) -> Result<PumpStats> {
        let running = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Running(running) => running,
            other => {
                let err = match other {
                    Phase::Ready { .. } => LifecycleError::NotStarted,
                    Phase::Closed => LifecycleError::Closed,
                    _ => LifecycleError::AlreadyStopped,
                };
                self.phase = other;
                return Err(err.into());
            }
        };

        running.cancel.cancel();
        let (sink, stats) = running.worker.await?;
        tracing::info!(
            segments = stats.segments,
            records = stats.records,
            chunks = stats.assembler.chunks,
            evicted_pages = stats.assembler.evicted_pages,
            decode_errors = stats.dissector.decode_errors,
            "capture pump stopped"
        );
        self.phase = Phase::Stopped {
            reader: running.reader,
            sink,
        };
        Ok(stats)
    }

    /// Join the reader, release the packet source and hand back the sink.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotStopped`] unless [`Sniffer::stop`] has
    /// completed, a capture error if the source failed while reading and a
    /// task error if the reader panicked.
    pub async fn close(&mut self) -> Result<K> {
        let (reader, sink) = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Stopped { reader, sink } => (reader, sink),
            Phase::Closed => return Err(LifecycleError::Closed.into()),
            other => {
                self.phase = other;
                return Err(LifecycleError::NotStopped.into());
            }
        };

        let ReaderOutcome { source, error } = reader.await?;
        drop(source);
        log::debug!("packet source released");
        match error {
            Some(e) => Err(e.into()),
            None => Ok(sink),
        }
    }

    /// Start, run until `shutdown` resolves or the source is exhausted,
    /// then stop and close.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Sniffer::start`], [`Sniffer::stop`] and
    /// [`Sniffer::close`].
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(K, PumpStats)>
    where
        F: Future<Output = ()> + Send,
    {
        self.start()?;
        let Phase::Running(running) = &self.phase else {
            return Err(LifecycleError::NotStarted.into());
        };
        let tracker = running.tracker.clone();

        select! {
            () = shutdown => tracing::info!("shutdown requested"),
            () = tracker.wait() => tracing::info!("packet source drained"),
        }

        let stats = self.stop().await?;
        let sink = self.close().await?;
        Ok((sink, stats))
    }
}

impl<S: PacketSource, K: RecordSink> Drop for Sniffer<S, K> {
    fn drop(&mut self) {
        if let Phase::Running(running) = &self.phase {
            running.cancel.cancel();
        }
    }
}

impl<S: PacketSource, K: RecordSink> std::fmt::Debug for Sniffer<S, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sniffer")
            .field("config", &self.config)
            .field("phase", &self.phase.name())
            .finish()
    }
}
