//! Ethernet frames and legacy pcap files built in memory.

use std::net::{Ipv4Addr, SocketAddrV4};

use etherparse::PacketBuilder;

/// Port of the simulated game server.
pub const SERVER_PORT: u16 = 16_000;
/// Address of the simulated game server.
pub const SERVER: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), SERVER_PORT);
/// Address of the simulated game client.
pub const CLIENT: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 50_000);

/// One TCP segment wrapped in IPv4 and Ethernet II.
#[derive(Clone, Debug)]
pub struct TcpFrame {
    src: SocketAddrV4,
    dst: SocketAddrV4,
    seq: u32,
    syn: bool,
    fin: bool,
    rst: bool,
    psh: bool,
    payload: Vec<u8>,
}

impl TcpFrame {
    /// Segment between arbitrary endpoints.
    #[must_use]
    pub fn new(src: SocketAddrV4, dst: SocketAddrV4, seq: u32, payload: &[u8]) -> Self {
        Self {
            src,
            dst,
            seq,
            syn: false,
            fin: false,
            rst: false,
            psh: false,
            payload: payload.to_vec(),
        }
    }

    /// Segment sent by the server to the client.
    #[must_use]
    pub fn from_server(seq: u32, payload: &[u8]) -> Self { Self::new(SERVER, CLIENT, seq, payload) }

    /// Segment sent by the client to the server.
    #[must_use]
    pub fn to_server(seq: u32, payload: &[u8]) -> Self { Self::new(CLIENT, SERVER, seq, payload) }

    /// Set PSH.
    #[must_use]
    pub fn push(mut self) -> Self {
        self.psh = true;
        self
    }

    /// Set SYN.
    #[must_use]
    pub fn syn(mut self) -> Self {
        self.syn = true;
        self
    }

    /// Set FIN.
    #[must_use]
    pub fn fin(mut self) -> Self {
        self.fin = true;
        self
    }

    /// Set RST.
    #[must_use]
    pub fn rst(mut self) -> Self {
        self.rst = true;
        self
    }

    /// Serialise as an Ethernet II frame.
    ///
    /// # Panics
    ///
    /// Panics if the payload does not fit in one IPv4 packet.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut builder = PacketBuilder::ethernet2([2, 0, 0, 0, 0, 1], [2, 0, 0, 0, 0, 2])
            .ipv4(self.src.ip().octets(), self.dst.ip().octets(), 64)
            .tcp(self.src.port(), self.dst.port(), self.seq, 65_535)
            .ack(1);
        if self.syn {
            builder = builder.syn();
        }
        if self.fin {
            builder = builder.fin();
        }
        if self.rst {
            builder = builder.rst();
        }
        if self.psh {
            builder = builder.psh();
        }
        let mut bytes = Vec::with_capacity(builder.size(self.payload.len()));
        builder
            .write(&mut bytes, &self.payload)
            .expect("frame fits in one packet");
        bytes
    }
}

/// Builds little-endian legacy pcap or pcapng files with Ethernet framing.
#[derive(Clone, Debug, Default)]
pub struct PcapBuilder {
    records: Vec<(u32, u32, Vec<u8>)>,
}

impl PcapBuilder {
    /// Empty capture.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `frame` captured at `secs` past the epoch.
    #[must_use]
    pub fn frame(self, secs: u32, frame: TcpFrame) -> Self { self.frame_at(secs, 0, frame) }

    /// Append `frame` captured at `secs` plus `micros` past the epoch.
    #[must_use]
    pub fn frame_at(self, secs: u32, micros: u32, frame: TcpFrame) -> Self {
        self.raw(secs, micros, frame.encode())
    }

    /// Append an arbitrary link-layer frame.
    #[must_use]
    pub fn raw(mut self, secs: u32, micros: u32, data: Vec<u8>) -> Self {
        self.records.push((secs, micros, data));
        self
    }

    /// Render the file.
    ///
    /// # Panics
    ///
    /// Panics if a frame is longer than `u32::MAX` bytes.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xa1b2_c3d4_u32.to_le_bytes());
        out.extend_from_slice(&2_u16.to_le_bytes());
        out.extend_from_slice(&4_u16.to_le_bytes());
        out.extend_from_slice(&0_i32.to_le_bytes());
        out.extend_from_slice(&0_u32.to_le_bytes());
        out.extend_from_slice(&65_535_u32.to_le_bytes());
        out.extend_from_slice(&1_u32.to_le_bytes());
        for (secs, micros, data) in &self.records {
            let len = u32::try_from(data.len()).expect("frame length fits in u32");
            out.extend_from_slice(&secs.to_le_bytes());
            out.extend_from_slice(&micros.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(data);
        }
        out
    }

    /// Render the capture as pcapng: one section, one Ethernet interface
    /// with microsecond timestamps and an enhanced packet block per frame.
    ///
    /// # Panics
    ///
    /// Panics if a frame is longer than `u32::MAX` bytes.
    #[must_use]
    pub fn build_ng(&self) -> Vec<u8> {
        let mut out = Vec::new();
        ng_block(&mut out, 0x0a0d_0d0a, |body| {
            body.extend_from_slice(&0x1a2b_3c4d_u32.to_le_bytes());
            body.extend_from_slice(&1_u16.to_le_bytes());
            body.extend_from_slice(&0_u16.to_le_bytes());
            body.extend_from_slice(&(-1_i64).to_le_bytes());
        });
        ng_block(&mut out, 1, |body| {
            body.extend_from_slice(&1_u16.to_le_bytes());
            body.extend_from_slice(&0_u16.to_le_bytes());
            body.extend_from_slice(&65_535_u32.to_le_bytes());
        });
        for (secs, micros, data) in &self.records {
            let micros = u64::from(*secs) * 1_000_000 + u64::from(*micros);
            let len = u32::try_from(data.len()).expect("frame length fits in u32");
            ng_block(&mut out, 6, |body| {
                body.extend_from_slice(&0_u32.to_le_bytes());
                body.extend_from_slice(&((micros >> 32) as u32).to_le_bytes());
                body.extend_from_slice(&(micros as u32).to_le_bytes());
                body.extend_from_slice(&len.to_le_bytes());
                body.extend_from_slice(&len.to_le_bytes());
                body.extend_from_slice(data);
                body.resize(body.len().next_multiple_of(4), 0);
            });
        }
        out
    }
}

fn ng_block(out: &mut Vec<u8>, block_type: u32, fill: impl FnOnce(&mut Vec<u8>)) {
    let mut body = Vec::new();
    fill(&mut body);
    let len = u32::try_from(body.len() + 12).expect("block length fits in u32");
    out.extend_from_slice(&block_type.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(&len.to_le_bytes());
}
