//! Page budgets and flush thresholds for the assembler.

use std::{num::NonZeroUsize, time::SystemTime};

use crate::sizing::ResourceLimits;

/// Caps on the number of out-of-order pages held by an
/// [`Assembler`](super::Assembler).
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use combat_dissector::reassembly::ReassemblyLimits;
///
/// let limits = ReassemblyLimits::new(
///     NonZeroUsize::new(10_000).expect("non-zero"),
///     NonZeroUsize::new(100).expect("non-zero"),
/// );
/// assert_eq!(limits.total_pages().get(), 10_000);
/// assert_eq!(limits.pages_per_connection().get(), 100);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReassemblyLimits {
    total_pages: NonZeroUsize,
    pages_per_connection: NonZeroUsize,
}

impl ReassemblyLimits {
    /// Create page budgets.
    #[must_use]
    pub const fn new(total_pages: NonZeroUsize, pages_per_connection: NonZeroUsize) -> Self {
        Self {
            total_pages,
            pages_per_connection,
        }
    }

    /// Pages buffered across every connection.
    #[must_use]
    pub const fn total_pages(&self) -> NonZeroUsize { self.total_pages }

    /// Pages buffered for a single connection.
    #[must_use]
    pub const fn pages_per_connection(&self) -> NonZeroUsize { self.pages_per_connection }
}

impl Default for ReassemblyLimits {
    fn default() -> Self { Self::from(ResourceLimits::FALLBACK) }
}

impl From<ResourceLimits> for ReassemblyLimits {
    fn from(limits: ResourceLimits) -> Self {
        let non_zero = |value| NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN);
        Self::new(
            non_zero(limits.total_pages),
            non_zero(limits.pages_per_connection),
        )
    }
}

/// Thresholds for a periodic flush.
///
/// Connections with no traffic since `close_before` are closed. Connections
/// holding data captured before `flush_before` have it force-delivered but
/// stay open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushOptions {
    pub close_before: SystemTime,
    pub flush_before: SystemTime,
}
