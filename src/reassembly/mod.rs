//! TCP stream reassembly.
//!
//! The [`Assembler`] turns captured segments into ordered, de-duplicated
//! byte runs per flow. Retransmitted bytes are dropped, overlaps trimmed and
//! out-of-order segments held as pages until their predecessor arrives. Page
//! memory is bounded by [`ReassemblyLimits`]; idle flows are reclaimed by
//! [`Assembler::flush_with_options`] and everything is drained by
//! [`Assembler::flush_all`] on shutdown.

pub mod assembler;
pub mod chunk;
pub mod connection;
pub mod flow;
pub mod limits;
mod seq;

pub use assembler::{Assembler, AssemblerStats};
pub use chunk::{Boundary, ReassembledChunk};
pub use connection::ConnectionState;
pub use flow::{CapturedSegment, FlowKey, TcpFlags};
pub use limits::{FlushOptions, ReassemblyLimits};
