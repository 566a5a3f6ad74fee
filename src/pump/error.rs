//! Misuse of the [`Sniffer`](super::Sniffer) lifecycle.

use thiserror::Error;

/// A lifecycle method was called out of order.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("sniffer has already been started")]
    AlreadyStarted,
    #[error("sniffer has not been started")]
    NotStarted,
    #[error("sniffer must be stopped before it is closed")]
    NotStopped,
    #[error("sniffer has already been stopped")]
    AlreadyStopped,
    #[error("sniffer has been closed")]
    Closed,
    #[error("sniffer must be started from within a tokio runtime")]
    NoRuntime,
}
