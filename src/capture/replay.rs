//! Capture file replay.
//!
//! Legacy pcap (microsecond or nanosecond timestamps) and pcapng files are
//! read incrementally with `pcap_parser`; the format is detected from the
//! file's magic number.

use std::{
    fs::File,
    io::{BufReader, Cursor, Read},
    path::Path,
    time::{Duration, SystemTime},
};

use pcap_parser::{
    LegacyPcapReader,
    PcapBlockOwned,
    PcapError,
    PcapNGReader,
    pcapng::Block,
    traits::{PcapNGPacketBlock, PcapReaderIterator},
};

use super::{CaptureError, LinkType, PacketSource, PortFilter, SourceEvent, decode_frame};

const BUFFER_SIZE: usize = 65_536;
const MICROS: u64 = 1_000_000;
const NANOS: u64 = 1_000_000_000;

type ByteStream = Box<dyn Read + Send>;

/// Capture file layout, from the first four bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Legacy,
    Ng,
}

impl Format {
    fn from_magic(magic: [u8; 4]) -> Option<Self> {
        match magic {
            // Microsecond, nanosecond and modified pcap, either byte order.
            [0xd4, 0xc3, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xc3, 0xd4]
            | [0x4d, 0x3c, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0x3c, 0x4d]
            | [0x34, 0xcd, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xcd, 0x34] => Some(Self::Legacy),
            [0x0a, 0x0d, 0x0d, 0x0a] => Some(Self::Ng),
            _ => None,
        }
    }
}

/// The block reader for whichever format the stream holds.
enum BlockReader {
    Legacy(LegacyPcapReader<ByteStream>),
    Ng(PcapNGReader<ByteStream>),
}

impl BlockReader {
    fn new(format: Format, stream: ByteStream) -> Result<Self, CaptureError> {
        let header_error = |e: PcapError<&'static [u8]>| CaptureError::Format(e.to_string());
        Ok(match format {
            Format::Legacy => {
                Self::Legacy(LegacyPcapReader::new(BUFFER_SIZE, stream).map_err(header_error)?)
            }
            Format::Ng => Self::Ng(PcapNGReader::new(BUFFER_SIZE, stream).map_err(header_error)?),
        })
    }

    fn blocks(&mut self) -> &mut dyn PcapReaderIterator {
        match self {
            Self::Legacy(reader) => reader,
            Self::Ng(reader) => reader,
        }
    }
}

/// Interpretation of block headers seen so far.
#[derive(Debug)]
struct ReplayState {
    link: LinkType,
    units_per_second: u64,
    last_timestamp: SystemTime,
    filter: PortFilter,
}

impl ReplayState {
    /// Turn a block into an event, or `None` for metadata blocks.
    fn handle(&mut self, block: PcapBlockOwned<'_>) -> Option<SourceEvent> {
        match block {
            PcapBlockOwned::LegacyHeader(header) => {
                self.link = LinkType::from_dlt(header.network.0);
                self.units_per_second = if header.is_nanosecond_precision() {
                    NANOS
                } else {
                    MICROS
                };
                None
            }
            PcapBlockOwned::Legacy(packet) => {
                let at = timestamp(
                    u64::from(packet.ts_sec),
                    u64::from(packet.ts_usec),
                    self.units_per_second,
                );
                Some(self.packet(packet.data, at))
            }
            PcapBlockOwned::NG(Block::InterfaceDescription(interface)) => {
                self.link = LinkType::from_dlt(interface.linktype.0);
                self.units_per_second = resolution(interface.if_tsresol);
                None
            }
            PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                let raw = (u64::from(packet.ts_high) << 32) | u64::from(packet.ts_low);
                let units = self.units_per_second.max(1);
                let at = timestamp(raw / units, raw % units, units);
                Some(self.packet(packet.packet_data(), at))
            }
            PcapBlockOwned::NG(Block::SimplePacket(packet)) => {
                Some(self.packet(packet.packet_data(), self.last_timestamp))
            }
            PcapBlockOwned::NG(_) => None,
        }
    }

    fn packet(&mut self, data: &[u8], at: SystemTime) -> SourceEvent {
        self.last_timestamp = at;
        match decode_frame(self.link, data, at) {
            Some(segment) if self.filter.matches(&segment) => SourceEvent::Segment(segment),
            _ => SourceEvent::Skipped,
        }
    }
}

/// Replays segments from a pcap or pcapng stream.
pub struct ReplaySource {
    reader: BlockReader,
    state: ReplayState,
    exhausted: bool,
}

impl ReplaySource {
    /// Open a capture file.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Open`] when the file cannot be opened and
    /// [`CaptureError::Format`] when it is not a pcap or pcapng file.
    pub fn open(path: impl AsRef<Path>, filter: PortFilter) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CaptureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), filter)
    }

    /// Replay a capture held in any reader.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Format`] when the stream does not start with
    /// a pcap or pcapng header.
    pub fn from_reader<R>(mut reader: R, filter: PortFilter) -> Result<Self, CaptureError>
    where
        R: Read + Send + 'static,
    {
        let mut magic = [0_u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| CaptureError::Format(format!("cannot read capture header: {e}")))?;
        let format = Format::from_magic(magic).ok_or_else(|| {
            CaptureError::Format(format!("unknown capture magic: {magic:02x?}"))
        })?;
        let stream: ByteStream = Box::new(Cursor::new(magic).chain(reader));
        Ok(Self {
            reader: BlockReader::new(format, stream)?,
            state: ReplayState {
                link: LinkType::Ethernet,
                units_per_second: MICROS,
                last_timestamp: SystemTime::UNIX_EPOCH,
                filter,
            },
            exhausted: false,
        })
    }
}

impl std::fmt::Debug for ReplaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySource")
            .field("state", &self.state)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl PacketSource for ReplaySource {
    fn next_event(&mut self) -> Result<SourceEvent, CaptureError> {
        if self.exhausted {
            return Ok(SourceEvent::Exhausted);
        }
        let reader = self.reader.blocks();
        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    let event = self.state.handle(block);
                    reader.consume(offset);
                    if let Some(event) = event {
                        return Ok(event);
                    }
                }
                Err(PcapError::Eof) => {
                    self.exhausted = true;
                    return Ok(SourceEvent::Exhausted);
                }
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| CaptureError::Format(e.to_string()))?;
                }
                Err(e) => return Err(CaptureError::Format(e.to_string())),
            }
        }
    }

    fn is_live(&self) -> bool { false }
}

/// Units per second encoded by a pcapng `if_tsresol` option.
fn resolution(tsresol: u8) -> u64 {
    let exponent = u32::from(tsresol & 0x7f);
    if tsresol & 0x80 == 0 {
        10_u64.checked_pow(exponent).unwrap_or(NANOS)
    } else {
        2_u64.checked_pow(exponent).unwrap_or(NANOS)
    }
}

fn timestamp(secs: u64, fraction: u64, units_per_second: u64) -> SystemTime {
    let nanos = u128::from(fraction) * u128::from(NANOS) / u128::from(units_per_second.max(1));
    let nanos = u64::try_from(nanos).unwrap_or(NANOS - 1);
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs) + Duration::from_nanos(nanos)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use rstest::rstest;

    use super::{Format, resolution, timestamp};

    #[rstest]
    #[case::micros(6, 1_000_000)]
    #[case::nanos(9, 1_000_000_000)]
    #[case::binary(0x80 | 10, 1_024)]
    fn pcapng_resolutions(#[case] tsresol: u8, #[case] units: u64) {
        assert_eq!(resolution(tsresol), units);
    }

    #[rstest]
    #[case::micros_le([0xd4, 0xc3, 0xb2, 0xa1], Some(Format::Legacy))]
    #[case::nanos_be([0xa1, 0xb2, 0x3c, 0x4d], Some(Format::Legacy))]
    #[case::pcapng([0x0a, 0x0d, 0x0d, 0x0a], Some(Format::Ng))]
    #[case::text(*b"GET ", None)]
    fn formats_are_detected_from_magic(#[case] magic: [u8; 4], #[case] format: Option<Format>) {
        assert_eq!(Format::from_magic(magic), format);
    }

    #[test]
    fn fractions_scale_to_nanoseconds() {
        let at = timestamp(2, 500_000, 1_000_000);

        assert_eq!(
            at,
            SystemTime::UNIX_EPOCH + Duration::from_secs(2) + Duration::from_millis(500)
        );
    }
}
