//! Crate-level error type.
//!
//! Each layer reports its own error enum; `DissectorError` gathers the
//! ones that can escape the capture pump.

use thiserror::Error;
use tokio::task::JoinError;

use crate::{capture::CaptureError, pump::LifecycleError};

/// Failure surfaced by a [`Sniffer`](crate::pump::Sniffer).
///
/// Malformed traffic never produces one of these: decode failures are
/// logged and skipped.
#[derive(Debug, Error)]
pub enum DissectorError {
    /// The packet source could not be opened or failed while reading.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// A lifecycle method was called out of order.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// The reader or worker task panicked or was aborted.
    #[error("capture pump task failed: {0}")]
    Task(#[from] JoinError),
}

/// Result alias defaulting to [`DissectorError`].
pub type Result<T, E = DissectorError> = std::result::Result<T, E>;
