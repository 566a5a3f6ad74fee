//! Passive combat record sniffer.
//!
//! Replays a capture file or captures live traffic, logging every decoded
//! record until the source is exhausted or a shutdown signal arrives.

mod cli;

use std::time::Duration;

use clap::Parser;
use combat_dissector::{
    capture::{PacketSource, PortFilter, ReplaySource},
    config::SnifferConfig,
    pump::Sniffer,
    sink::LogSink,
    sizing::ResourceLimits,
};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    install_metrics(&cli)?;

    let limits = ResourceLimits::detect();
    tracing::info!(
        total_pages = limits.total_pages,
        pages_per_connection = limits.pages_per_connection,
        buffer_size = limits.buffer_size,
        "resource limits"
    );
    let config = SnifferConfig::new(limits)
        .port(cli.port)
        .flush_interval(Duration::from_secs(cli.flush_interval));

    let source: Box<dyn PacketSource> = match cli.command {
        Command::Replay { file } => Box::new(ReplaySource::open(&file, config.filter())?),
        Command::Live { device } => live_source(device.as_deref(), config.filter())?,
    };

    let (_, stats) = Sniffer::new(config, source, LogSink)
        .run_until(shutdown_signal())
        .await?;
    tracing::info!(
        segments = stats.segments,
        records = stats.records,
        decode_errors = stats.dissector.decode_errors,
        "capture finished"
    );
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_metrics(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        tracing::info!(%addr, "serving metrics");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.metrics_addr.is_some() {
        tracing::warn!("built without the metrics feature, ignoring --metrics-addr");
    }
    Ok(())
}

#[cfg(feature = "live")]
fn live_source(
    device: Option<&str>,
    filter: PortFilter,
) -> Result<Box<dyn PacketSource>, Box<dyn std::error::Error>> {
    Ok(Box::new(combat_dissector::capture::LiveSource::open(device, filter)?))
}

#[cfg(not(feature = "live"))]
fn live_source(
    _device: Option<&str>,
    _filter: PortFilter,
) -> Result<Box<dyn PacketSource>, Box<dyn std::error::Error>> {
    Err("built without live capture support; rebuild with --features live".into())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
