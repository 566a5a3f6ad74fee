//! Fixtures for exercising `combat-dissector` without a network.
//!
//! The helpers produce raw bytes only: protocol envelopes, Ethernet frames
//! and whole capture files. Tests feed them through the dissector's public
//! API.
//!
//! ```rust
//! use dissector_testing::{PcapBuilder, TcpFrame, envelope, segment};
//!
//! let payload = envelope(&[segment(10_308, &[0; 35])]);
//! let capture = PcapBuilder::new()
//!     .frame(1, TcpFrame::to_server(1_000, &payload).push())
//!     .build();
//! assert!(capture.len() > payload.len());
//! ```

pub mod capture;
pub mod logging;
pub mod protocol;

pub use capture::{CLIENT, PcapBuilder, SERVER, SERVER_PORT, TcpFrame};
pub use logging::{LoggerHandle, logger};
pub use protocol::{attack_payload, brotli_segment, compress, envelope, hp_payload, segment};
