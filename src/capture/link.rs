//! Link-layer frame decoding.

use std::{
    net::{IpAddr, SocketAddr},
    time::SystemTime,
};

use bytes::Bytes;
use etherparse::{NetSlice, SlicedPacket, TransportSlice};

use crate::reassembly::{CapturedSegment, FlowKey, TcpFlags};

/// Link-layer framing of captured packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkType {
    /// Ethernet II, optionally VLAN tagged.
    Ethernet,
    /// Bare IPv4 or IPv6 packets.
    RawIp,
    /// Linux cooked capture (`any` device).
    LinuxSll,
    /// BSD loopback with a 4-byte address family header.
    Loopback,
    /// A framing this dissector cannot read.
    Other(i32),
}

impl LinkType {
    /// Map a pcap `LINKTYPE_`/`DLT_` value.
    #[must_use]
    pub const fn from_dlt(value: i32) -> Self {
        match value {
            1 => Self::Ethernet,
            12 | 14 | 101 | 228 | 229 => Self::RawIp,
            113 => Self::LinuxSll,
            0 | 108 => Self::Loopback,
            other => Self::Other(other),
        }
    }
}

/// Decode a captured link-layer frame into a TCP segment.
///
/// Returns `None` for frames that are not TCP over IPv4 or IPv6, for
/// truncated frames and for unsupported link types.
#[must_use]
pub fn decode_frame(link: LinkType, data: &[u8], captured_at: SystemTime) -> Option<CapturedSegment> {
    let sliced = match link {
        LinkType::Ethernet => SlicedPacket::from_ethernet(data).ok()?,
        LinkType::RawIp => SlicedPacket::from_ip(data).ok()?,
        LinkType::LinuxSll => SlicedPacket::from_linux_sll(data).ok()?,
        LinkType::Loopback => SlicedPacket::from_ip(data.get(4..)?).ok()?,
        LinkType::Other(_) => return None,
    };

    let (src, dst): (IpAddr, IpAddr) = match sliced.net? {
        NetSlice::Ipv4(ip) => (
            ip.header().source_addr().into(),
            ip.header().destination_addr().into(),
        ),
        NetSlice::Ipv6(ip) => (
            ip.header().source_addr().into(),
            ip.header().destination_addr().into(),
        ),
        _ => return None,
    };
    let Some(TransportSlice::Tcp(tcp)) = sliced.transport else {
        return None;
    };

    Some(CapturedSegment {
        flow: FlowKey::new(
            SocketAddr::new(src, tcp.source_port()),
            SocketAddr::new(dst, tcp.destination_port()),
        ),
        seq: tcp.sequence_number(),
        flags: TcpFlags {
            syn: tcp.syn(),
            ack: tcp.ack(),
            fin: tcp.fin(),
            rst: tcp.rst(),
            psh: tcp.psh(),
        },
        captured_at,
        payload: Bytes::copy_from_slice(tcp.payload()),
    })
}
