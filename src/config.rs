//! Capture pump configuration.

use std::time::{Duration, SystemTime};

use crate::{capture::PortFilter, reassembly::FlushOptions, sizing::ResourceLimits};

/// Interval between periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Idle time after which a connection is closed by a periodic flush.
pub const DEFAULT_CLOSE_AFTER: Duration = Duration::from_secs(6);
/// Age after which buffered data is delivered across gaps.
pub const DEFAULT_FLUSH_AFTER: Duration = Duration::from_secs(4);

/// Settings for a [`Sniffer`](crate::pump::Sniffer).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use combat_dissector::{config::SnifferConfig, sizing::ResourceLimits};
///
/// let config = SnifferConfig::new(ResourceLimits::FALLBACK)
///     .port(16_001)
///     .flush_interval(Duration::from_secs(1));
/// assert_eq!(config.filter().port(), 16_001);
/// assert_eq!(config.close_threshold(), Duration::from_secs(6));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnifferConfig {
    filter: PortFilter,
    flush_interval: Duration,
    close_after: Duration,
    flush_after: Duration,
    limits: ResourceLimits,
}

impl SnifferConfig {
    /// Default timings with explicit resource limits.
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            filter: PortFilter::default(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            close_after: DEFAULT_CLOSE_AFTER,
            flush_after: DEFAULT_FLUSH_AFTER,
            limits,
        }
    }

    /// Restrict capture to `port`.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.filter = PortFilter::new(port);
        self
    }

    /// Set the periodic flush interval. Zero is raised to one millisecond.
    #[must_use]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the idle time after which connections are closed.
    #[must_use]
    pub fn close_after(mut self, after: Duration) -> Self {
        self.close_after = after;
        self
    }

    /// Set the age after which buffered data is force-delivered.
    #[must_use]
    pub fn flush_after(mut self, after: Duration) -> Self {
        self.flush_after = after;
        self
    }

    /// Replace the resource limits.
    #[must_use]
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Port filter applied to captured segments.
    #[must_use]
    pub fn filter(&self) -> PortFilter { self.filter }

    #[must_use]
    pub fn flush_period(&self) -> Duration { self.flush_interval }

    #[must_use]
    pub fn close_threshold(&self) -> Duration { self.close_after }

    #[must_use]
    pub fn flush_threshold(&self) -> Duration { self.flush_after }

    #[must_use]
    pub fn resource_limits(&self) -> ResourceLimits { self.limits }

    /// Thresholds for a periodic flush observed at `now`, never earlier
    /// than the Unix epoch.
    #[must_use]
    pub fn flush_options(&self, now: SystemTime) -> FlushOptions {
        let before = |age| {
            now.checked_sub(age)
                .map_or(SystemTime::UNIX_EPOCH, |at| at.max(SystemTime::UNIX_EPOCH))
        };
        FlushOptions {
            close_before: before(self.close_after),
            flush_before: before(self.flush_after),
        }
    }
}

/// Default timings with limits detected from the host.
impl Default for SnifferConfig {
    fn default() -> Self { Self::new(ResourceLimits::detect()) }
}
