//! pinbeatd - drive a heartbeat pin from the command line.
//!
//! Stands in for the host platform integration: it sources the two
//! waveform parameters (period and pulse width) from the command line,
//! starts the scheduler against a log-only sink, and tears everything
//! down when the run ends.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pinbeat::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "pinbeatd", version)]
#[command(about = "Drive a heartbeat waveform for external watchdog hardware")]
struct Cli {
    /// Total waveform period in milliseconds.
    #[arg(long, default_value_t = 500)]
    period_ms: u32,

    /// Active pulse width in milliseconds (must leave a rest phase of
    /// at least half the period).
    #[arg(long, default_value_t = 100)]
    pulse_width_ms: u32,

    /// Stop after this many seconds; runs until killed if omitted.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pinbeat={default_level},pinbeatd={default_level}"))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = PulseConfig::validate(cli.period_ms, cli.pulse_width_ms)
        .context("invalid heartbeat pulse settings")?;

    let mut heartbeat = Heartbeat::start(config, Box::new(TracingSink::new()))
        .context("failed to start heartbeat")?;

    match cli.duration_secs {
        Some(secs) => {
            tracing::info!(secs, "running for a fixed duration");
            thread::sleep(Duration::from_secs(secs));
        }
        None => {
            tracing::info!("running until killed");
            loop {
                thread::sleep(Duration::from_secs(3600));
            }
        }
    }

    heartbeat.stop();
    Ok(())
}
