//! Adaptive resource limits derived from the host.
//!
//! Page budgets scale with available memory and the packet channel scales
//! with CPU count. Sizing is best effort: when memory statistics cannot be
//! read, [`ResourceLimits::FALLBACK`] is used instead.

use log::warn;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MEMORY_SHARE: f64 = 0.1;
const PAGES_PER_GIB: f64 = 250_000.0;
const BUFFER_PER_CPU: usize = 500;
const BUFFER_PER_GIB: f64 = 200.0;

const TOTAL_PAGES_RANGE: (usize, usize) = (10_000, 500_000);
const CONNECTION_PAGES_RANGE: (usize, usize) = (100, 5_000);
const BUFFER_RANGE: (usize, usize) = (1_000, 10_000);

/// Budgets computed at start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceLimits {
    /// Out-of-order pages buffered across every connection.
    pub total_pages: usize,
    /// Out-of-order pages buffered per connection.
    pub pages_per_connection: usize,
    /// Capacity of the channel between the packet reader and the worker.
    pub buffer_size: usize,
}

impl ResourceLimits {
    /// Limits used when host memory cannot be inspected.
    pub const FALLBACK: Self = Self {
        total_pages: TOTAL_PAGES_RANGE.0,
        pages_per_connection: CONNECTION_PAGES_RANGE.0,
        buffer_size: BUFFER_RANGE.0,
    };

    /// Compute limits from available memory and logical CPU count.
    ///
    /// Ten percent of available memory is budgeted for reassembly at
    /// 250 000 pages per GiB, clamped to `[10_000, 500_000]`. Each
    /// connection may use a hundredth of that, clamped to `[100, 5_000]`.
    /// The buffer gets 500 slots per CPU plus 200 per GiB available,
    /// clamped to `[1_000, 10_000]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use combat_dissector::sizing::ResourceLimits;
    ///
    /// let limits = ResourceLimits::compute(8 * 1024 * 1024 * 1024, 4);
    /// assert_eq!(limits.total_pages, 200_000);
    /// assert_eq!(limits.pages_per_connection, 2_000);
    /// assert_eq!(limits.buffer_size, 3_600);
    /// ```
    #[must_use]
    pub fn compute(available_bytes: u64, cpu_count: usize) -> Self {
        #[expect(
            clippy::cast_precision_loss,
            reason = "Sizing only needs an approximate gigabyte count."
        )]
        let available_gib = available_bytes as f64 / GIB;

        let total_pages = clamp(
            truncate(available_gib * MEMORY_SHARE * PAGES_PER_GIB),
            TOTAL_PAGES_RANGE,
        );
        let pages_per_connection = clamp(total_pages / 100, CONNECTION_PAGES_RANGE);
        let buffer_size = clamp(
            cpu_count
                .saturating_mul(BUFFER_PER_CPU)
                .saturating_add(truncate(available_gib * BUFFER_PER_GIB)),
            BUFFER_RANGE,
        );

        Self {
            total_pages,
            pages_per_connection,
            buffer_size,
        }
    }

    /// Inspect the host and compute limits.
    ///
    /// Falls back to [`ResourceLimits::FALLBACK`] with a warning when the
    /// platform reports no available memory.
    #[must_use]
    pub fn detect() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );
        let available = system.available_memory();
        if available == 0 {
            warn!("unable to read available memory, using fallback resource limits");
            return Self::FALLBACK;
        }
        Self::compute(available, num_cpus::get())
    }
}

impl Default for ResourceLimits {
    fn default() -> Self { Self::FALLBACK }
}

fn clamp(value: usize, (min, max): (usize, usize)) -> usize { value.clamp(min, max) }

fn truncate(value: f64) -> usize {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Fractional pages are discarded and the input is never negative."
    )]
    let whole = value as usize;
    whole
}
