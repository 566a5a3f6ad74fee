//! Live capture from a network device through libpcap.

use std::time::{Duration, SystemTime};

use pcap::{Active, Capture, Device};

use super::{CaptureError, LinkType, PacketSource, PortFilter, SourceEvent, decode_frame};

const SNAPLEN: i32 = 65_535;
const READ_TIMEOUT_MS: i32 = 500;

/// Captures segments from a network device.
///
/// The device is opened in promiscuous mode with the filter's BPF
/// expression installed. Reads time out periodically so the pump can
/// observe shutdown.
pub struct LiveSource {
    capture: Capture<Active>,
    link: LinkType,
    filter: PortFilter,
}

impl LiveSource {
    /// Open `device`, or the first device libpcap reports.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no device exists and
    /// [`CaptureError::Live`] when the device cannot be opened or the
    /// filter cannot be installed.
    pub fn open(device: Option<&str>, filter: PortFilter) -> Result<Self, CaptureError> {
        let device = match device {
            Some(name) => Device::from(name),
            None => Device::list()?
                .into_iter()
                .next()
                .ok_or(CaptureError::NoDevice)?,
        };
        log::info!("opening capture device: name={}", device.name);

        let mut capture = Capture::from_device(device)?
            .promisc(true)
            .snaplen(SNAPLEN)
            .timeout(READ_TIMEOUT_MS)
            .open()?;
        capture.filter(&filter.bpf(), true)?;
        let link = LinkType::from_dlt(capture.get_datalink().0);

        Ok(Self {
            capture,
            link,
            filter,
        })
    }
}

impl std::fmt::Debug for LiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSource")
            .field("link", &self.link)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl PacketSource for LiveSource {
    fn next_event(&mut self) -> Result<SourceEvent, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let secs = u64::try_from(ts.tv_sec).unwrap_or_default();
                let micros = u64::try_from(i64::from(ts.tv_usec)).unwrap_or_default();
                let at = SystemTime::UNIX_EPOCH
                    + Duration::from_secs(secs)
                    + Duration::from_micros(micros);
                Ok(match decode_frame(self.link, packet.data, at) {
                    Some(segment) if self.filter.matches(&segment) => SourceEvent::Segment(segment),
                    _ => SourceEvent::Skipped,
                })
            }
            Err(pcap::Error::TimeoutExpired) => Ok(SourceEvent::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(SourceEvent::Exhausted),
            Err(e) => Err(e.into()),
        }
    }

    fn is_live(&self) -> bool { true }
}
