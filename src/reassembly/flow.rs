//! Flow identity and captured TCP segments.

use std::{fmt, net::SocketAddr, time::SystemTime};

use bytes::Bytes;
use serde::Serialize;

/// One direction of a TCP connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FlowKey {
    pub src: SocketAddr,
    pub dst: SocketAddr,
}

impl FlowKey {
    /// Create a key for traffic sent from `src` to `dst`.
    #[must_use]
    pub const fn new(src: SocketAddr, dst: SocketAddr) -> Self { Self { src, dst } }

    /// The opposite direction of the same connection.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }

    /// Whether either endpoint uses `port`.
    #[must_use]
    pub fn touches_port(&self, port: u16) -> bool {
        self.src.port() == port || self.dst.port() == port
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}->{}", self.src, self.dst) }
}

/// TCP control flags relevant to reassembly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "Mirrors the independent TCP header flag bits."
)]
pub struct TcpFlags {
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
    pub psh: bool,
}

impl TcpFlags {
    /// Flags of a plain data segment carrying a PUSH.
    #[must_use]
    pub const fn push() -> Self {
        Self {
            syn: false,
            ack: true,
            fin: false,
            rst: false,
            psh: true,
        }
    }

    /// Flags of a plain data segment without a PUSH.
    #[must_use]
    pub const fn data() -> Self {
        Self {
            syn: false,
            ack: true,
            fin: false,
            rst: false,
            psh: false,
        }
    }

    /// Whether this segment ends the sending side of its flow.
    #[must_use]
    pub const fn closes(self) -> bool { self.fin || self.rst }
}

/// A TCP segment as observed on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedSegment {
    pub flow: FlowKey,
    pub seq: u32,
    pub flags: TcpFlags,
    pub captured_at: SystemTime,
    pub payload: Bytes,
}

impl CapturedSegment {
    /// Sequence number of the first payload byte.
    ///
    /// A SYN occupies one sequence number ahead of any data it carries.
    #[must_use]
    pub const fn data_seq(&self) -> u32 {
        if self.flags.syn {
            self.seq.wrapping_add(1)
        } else {
            self.seq
        }
    }
}
