//! Tests for frame decoding, port filtering and capture replay.

use std::{
    io::Cursor,
    net::{Ipv6Addr, SocketAddr},
    time::{Duration, SystemTime},
};

use dissector_testing::{CLIENT, PcapBuilder, SERVER, TcpFrame};
use etherparse::PacketBuilder;
use rstest::rstest;

use super::*;

fn at(secs: u64) -> SystemTime { SystemTime::UNIX_EPOCH + Duration::from_secs(secs) }

fn raw_ipv4_tcp(payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ipv4([10, 0, 0, 2], [10, 0, 0, 1], 64)
        .tcp(50_000, 16_000, 99, 1_024)
        .psh();
    let mut bytes = Vec::new();
    builder.write(&mut bytes, payload).expect("build packet");
    bytes
}

fn udp_frame() -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([2; 6], [4; 6])
        .ipv4([10, 0, 0, 2], [10, 0, 0, 1], 64)
        .udp(50_000, 16_000);
    let mut bytes = Vec::new();
    builder.write(&mut bytes, b"datagram").expect("build packet");
    bytes
}

#[test]
fn ethernet_ipv4_frame_decodes_to_segment() {
    let frame = TcpFrame::to_server(7, b"abc").push().encode();

    let segment = decode_frame(LinkType::Ethernet, &frame, at(3)).expect("tcp segment");

    assert_eq!(segment.flow.src, SocketAddr::V4(CLIENT));
    assert_eq!(segment.flow.dst, SocketAddr::V4(SERVER));
    assert_eq!(segment.seq, 7);
    assert!(segment.flags.psh);
    assert!(segment.flags.ack);
    assert!(!segment.flags.syn);
    assert_eq!(segment.captured_at, at(3));
    assert_eq!(&segment.payload[..], b"abc");
}

#[test]
fn ethernet_ipv6_frame_decodes_to_segment() {
    let src = Ipv6Addr::LOCALHOST;
    let dst = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    let builder = PacketBuilder::ethernet2([2; 6], [4; 6])
        .ipv6(src.octets(), dst.octets(), 64)
        .tcp(16_000, 40_000, 5, 1_024)
        .fin();
    let mut frame = Vec::new();
    builder.write(&mut frame, &[]).expect("build packet");

    let segment = decode_frame(LinkType::Ethernet, &frame, at(1)).expect("tcp segment");

    assert_eq!(segment.flow.src, SocketAddr::new(src.into(), 16_000));
    assert_eq!(segment.flow.dst, SocketAddr::new(dst.into(), 40_000));
    assert!(segment.flags.fin);
    assert!(segment.payload.is_empty());
}

#[test]
fn raw_ip_and_loopback_framing_decode() {
    let packet = raw_ipv4_tcp(b"payload");
    let mut looped = vec![2, 0, 0, 0];
    looped.extend_from_slice(&packet);

    let raw = decode_frame(LinkType::RawIp, &packet, at(1)).expect("raw ip segment");
    let lo = decode_frame(LinkType::Loopback, &looped, at(1)).expect("loopback segment");

    assert_eq!(raw, lo);
    assert_eq!(raw.seq, 99);
    assert_eq!(&raw.payload[..], b"payload");
}

#[rstest]
#[case::udp(LinkType::Ethernet, udp_frame())]
#[case::truncated(LinkType::Ethernet, TcpFrame::to_server(1, b"x").encode()[..20].to_vec())]
#[case::unsupported_link(LinkType::Other(147), TcpFrame::to_server(1, b"x").encode())]
#[case::short_loopback(LinkType::Loopback, vec![2, 0])]
fn non_tcp_frames_are_ignored(#[case] link: LinkType, #[case] frame: Vec<u8>) {
    assert!(decode_frame(link, &frame, at(0)).is_none());
}

#[rstest]
#[case(1, LinkType::Ethernet)]
#[case(101, LinkType::RawIp)]
#[case(113, LinkType::LinuxSll)]
#[case(0, LinkType::Loopback)]
#[case(147, LinkType::Other(147))]
fn link_types_map_from_dlt(#[case] dlt: i32, #[case] expected: LinkType) {
    assert_eq!(LinkType::from_dlt(dlt), expected);
}

#[test]
fn port_filter_matches_either_direction() {
    let inbound = decode_frame(LinkType::Ethernet, &TcpFrame::to_server(1, b"a").encode(), at(0))
        .expect("segment");
    let outbound =
        decode_frame(LinkType::Ethernet, &TcpFrame::from_server(1, b"a").encode(), at(0))
            .expect("segment");

    assert!(PortFilter::default().matches(&inbound));
    assert!(PortFilter::default().matches(&outbound));
    assert!(!PortFilter::new(80).matches(&inbound));
    assert_eq!(PortFilter::new(80).bpf(), "tcp and port 80");
}

#[test]
fn replay_yields_segments_then_exhausts() {
    let other_port = TcpFrame::new(
        "10.0.0.2:50000".parse().expect("addr"),
        "10.0.0.9:443".parse().expect("addr"),
        1,
        b"tls",
    );
    let capture = PcapBuilder::new()
        .frame_at(10, 250_000, TcpFrame::to_server(1, b"one").push())
        .raw(11, 0, udp_frame())
        .frame(12, other_port)
        .frame(13, TcpFrame::from_server(500, b"two"))
        .build();
    let mut source =
        ReplaySource::from_reader(Cursor::new(capture), PortFilter::default()).expect("open");

    let SourceEvent::Segment(first) = source.next_event().expect("read") else {
        panic!("expected a segment");
    };
    assert_eq!(&first.payload[..], b"one");
    assert_eq!(first.captured_at, at(10) + Duration::from_millis(250));
    assert_eq!(source.next_event().expect("read"), SourceEvent::Skipped);
    assert_eq!(source.next_event().expect("read"), SourceEvent::Skipped);
    let SourceEvent::Segment(second) = source.next_event().expect("read") else {
        panic!("expected a segment");
    };
    assert_eq!(second.seq, 500);
    assert_eq!(source.next_event().expect("read"), SourceEvent::Exhausted);
    assert_eq!(source.next_event().expect("read"), SourceEvent::Exhausted);
    assert!(!source.is_live());
}

#[test]
fn pcapng_replay_strips_block_padding() {
    let capture = PcapBuilder::new()
        .frame_at(20, 500, TcpFrame::to_server(1, b"one").push())
        .frame(21, TcpFrame::from_server(9, b"three"))
        .build_ng();
    let mut source =
        ReplaySource::from_reader(Cursor::new(capture), PortFilter::default()).expect("open");

    let SourceEvent::Segment(first) = source.next_event().expect("read") else {
        panic!("expected a segment");
    };
    let SourceEvent::Segment(second) = source.next_event().expect("read") else {
        panic!("expected a segment");
    };

    assert_eq!(&first.payload[..], b"one");
    assert_eq!(first.captured_at, at(20) + Duration::from_micros(500));
    assert_eq!(&second.payload[..], b"three");
    assert_eq!(second.flow.src, SocketAddr::V4(SERVER));
    assert_eq!(source.next_event().expect("read"), SourceEvent::Exhausted);
}

#[test]
fn replay_rejects_truncated_headers() {
    let err = ReplaySource::from_reader(Cursor::new(vec![0xd4, 0xc3]), PortFilter::default())
        .expect_err("too short");

    assert!(matches!(err, CaptureError::Format(_)));
}

#[test]
fn replay_rejects_non_capture_data() {
    let err = ReplaySource::from_reader(Cursor::new(vec![0x42; 64]), PortFilter::default())
        .expect_err("not a capture");

    assert!(matches!(err, CaptureError::Format(_)));
}

#[test]
fn replay_reports_missing_files() {
    let err = ReplaySource::open("/nonexistent/combat.pcap", PortFilter::default())
        .expect_err("missing file");

    assert!(matches!(err, CaptureError::Open { .. }));
    assert!(err.to_string().contains("/nonexistent/combat.pcap"));
}

#[test]
fn memory_source_drains_then_exhausts_or_idles() {
    let segment = decode_frame(LinkType::Ethernet, &TcpFrame::to_server(1, b"a").encode(), at(0))
        .expect("segment");

    let mut replay = MemorySource::new([segment.clone()]);
    let mut live = MemorySource::new([segment]).live();

    assert!(matches!(replay.next_event(), Ok(SourceEvent::Segment(_))));
    assert_eq!(replay.next_event().expect("read"), SourceEvent::Exhausted);
    assert!(matches!(live.next_event(), Ok(SourceEvent::Segment(_))));
    assert_eq!(live.next_event().expect("read"), SourceEvent::Idle);
    assert!(live.is_live());
}
