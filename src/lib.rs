//! Public API for the `combat-dissector` library.
//!
//! This crate passively reconstructs game server TCP streams and decodes
//! the combat records carried inside them: packets come from a
//! [`capture::PacketSource`], are reassembled per connection by
//! [`reassembly::Assembler`], split into protocol segments by
//! [`frame::extract`] and decoded by [`record::decode_segment`]. The
//! [`pump::Sniffer`] ties these together on a single worker task.

pub mod byte_order;
pub mod capture;
pub mod config;
pub mod dissect;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod pump;
pub mod reassembly;
pub mod record;
pub mod sink;
pub mod sizing;

pub use capture::{MemorySource, PacketSource, PortFilter, ReplaySource, SourceEvent};
pub use config::SnifferConfig;
pub use dissect::{Dissector, SniffedRecord};
pub use error::{DissectorError, Result};
pub use pump::{LifecycleError, PumpStats, Sniffer};
pub use record::DecodedRecord;
pub use sink::{LogSink, RecordSink};
pub use sizing::ResourceLimits;
