//! Errors raised by packet sources.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure to open or read a packet source.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A capture file could not be opened.
    #[error("failed to open capture file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A capture file is not valid pcap or pcapng.
    #[error("malformed capture file: {0}")]
    Format(String),
    /// No capture device is available.
    #[error("no capture device available")]
    NoDevice,
    /// The live capture backend reported an error.
    #[cfg(feature = "live")]
    #[error("live capture failed: {0}")]
    Live(#[from] pcap::Error),
}
