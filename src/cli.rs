//! Command line interface for the `combat-dissector` binary.
//!
//! Kept free of crate imports so the build script can render a man page
//! from it.

use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};

/// Command line arguments for the `combat-dissector` binary.
#[derive(Debug, Parser)]
#[command(
    name = "combat-dissector",
    version,
    about = "Passively decode combat records from game server traffic"
)]
pub struct Cli {
    /// TCP port of the game server.
    #[arg(short, long, default_value_t = 16_000, global = true)]
    pub port: u16,
    /// Seconds between periodic flushes of idle connections.
    #[arg(long, value_name = "SECONDS", default_value_t = 5, global = true)]
    pub flush_interval: u64,
    /// Serve Prometheus metrics on this address.
    #[arg(long, value_name = "ADDR", global = true)]
    pub metrics_addr: Option<SocketAddr>,
    #[command(subcommand)]
    pub command: Command,
}

/// Where packets come from.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a pcap or pcapng capture file.
    Replay {
        /// Capture file to read.
        file: PathBuf,
    },
    /// Capture from a network device (requires the `live` feature).
    Live {
        /// Device to open; defaults to the first device found.
        #[arg(short, long)]
        device: Option<String>,
    },
}
