//! Restriction of captured traffic to the game server port.

use crate::reassembly::CapturedSegment;

/// TCP port the game server listens on.
pub const DEFAULT_PORT: u16 = 16_000;

/// Keeps only segments to or from one TCP port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortFilter {
    port: u16,
}

impl PortFilter {
    /// Filter on `port`.
    #[must_use]
    pub const fn new(port: u16) -> Self { Self { port } }

    /// Port being matched.
    #[must_use]
    pub const fn port(&self) -> u16 { self.port }

    /// Whether `segment` was sent to or from the filtered port.
    #[must_use]
    pub fn matches(&self, segment: &CapturedSegment) -> bool { segment.flow.touches_port(self.port) }

    /// BPF expression selecting the same traffic in a capture backend.
    ///
    /// # Examples
    ///
    /// ```
    /// use combat_dissector::capture::PortFilter;
    ///
    /// assert_eq!(PortFilter::default().bpf(), "tcp and port 16000");
    /// ```
    #[must_use]
    pub fn bpf(&self) -> String { format!("tcp and port {}", self.port) }
}

impl Default for PortFilter {
    fn default() -> Self { Self::new(DEFAULT_PORT) }
}
