//! # Departure Board Entry Point
//!
//! Loads and validates the configuration, then either runs the framebuffer
//! daemon until SIGINT/SIGTERM or, with `--stdout`, fetches once and prints a
//! text board for development without a display.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use departure_board_lib::{
    ascii::draw_ascii,
    cache::DepartureCache,
    config::Config,
    encoder::PixelFormat,
    feed::HttpFeed,
    lifecycle::{self, SystemClock, TerminationSignals},
    poller::PollLoop,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "U-Bahn departure display for a Linux framebuffer")]
struct Args {
    /// Configuration file (defaults to ./departure-config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fetch once, print a text board and exit
    #[arg(long)]
    stdout: bool,

    /// Default to debug logging when RUST_LOG is unset
    #[arg(short, long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Development mode: one fetch, text output, no device access.
async fn print_once(config: &Config, feed: HttpFeed) -> anyhow::Result<()> {
    let poller = PollLoop::new(feed, DepartureCache::new(), config);
    match poller.fetch_filtered().await {
        Ok(departures) => {
            draw_ascii(&departures, config, &Local::now());
            Ok(())
        }
        Err(e) => {
            error!(kind = e.kind(), error = %e, "departure fetch failed");
            Err(anyhow::anyhow!("departure fetch failed ({}): {}", e.kind(), e))
        }
    }
}

async fn run_daemon(config: &Config, format: PixelFormat, feed: HttpFeed) -> anyhow::Result<()> {
    let signals = TerminationSignals::install().context("failed to install signal handlers")?;
    let summary = lifecycle::run(config, format, feed, SystemClock, signals.first()).await;
    info!(
        frames = summary.frames,
        display = summary.display_enabled,
        phase = ?summary.phase,
        "exiting"
    );
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    // The only fatal error class, and only before anything is started
    let format = config.validate().context("invalid configuration")?;

    let rt = tokio::runtime::Runtime::new()?;
    let feed = HttpFeed::new(&config.feed).context("failed to build HTTP client")?;

    if args.stdout {
        return rt.block_on(print_once(&config, feed));
    }

    rt.block_on(run_daemon(&config, format, feed))
}
