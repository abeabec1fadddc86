//! # Board Lifecycle
//!
//! Startup, the two concurrent loops, and graceful shutdown.
//!
//! ```text
//! Starting ──> Running ──signal──> ShuttingDown ──> Stopped
//! ```
//!
//! - **Starting**: hide the cursor, open and clear the framebuffer, spawn the
//!   poll loop.
//! - **Running**: render ticker in the foreground, poll loop in the
//!   background, each on its own period.
//! - **ShuttingDown**: stop ticking, tell the poll loop to stop and wait for
//!   any in-flight fetch, restore the cursor, close the device.
//! - **Stopped**: [`run`] returns and the process exits 0.

use crate::cache::DepartureCache;
use crate::composer::{palette, FrameComposer};
use crate::config::Config;
use crate::encoder::PixelFormat;
use crate::feed::DepartureFeed;
use crate::framebuffer::FramebufferWriter;
use crate::poller::PollLoop;
use chrono::{DateTime, Local};
use std::future::Future;
use std::io::{self, Write};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

/// Phase tracker. Each transition happens at most once.
#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Starting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mark_running(&mut self) -> bool {
        self.advance(Phase::Starting, Phase::Running)
    }

    /// True only for the first shutdown request.
    pub fn begin_shutdown(&mut self) -> bool {
        match self.phase {
            Phase::Starting | Phase::Running => {
                info!(from = ?self.phase, "shutting down");
                self.phase = Phase::ShuttingDown;
                true
            }
            Phase::ShuttingDown | Phase::Stopped => false,
        }
    }

    pub fn mark_stopped(&mut self) -> bool {
        self.advance(Phase::ShuttingDown, Phase::Stopped)
    }

    fn advance(&mut self, from: Phase, to: Phase) -> bool {
        if self.phase == from {
            debug!(?from, ?to, "lifecycle transition");
            self.phase = to;
            true
        } else {
            false
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of the wall-clock time shown and used for countdowns.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// The system clock in the local timezone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Hides the console cursor, restoring it exactly once.
#[derive(Debug)]
pub struct CursorGuard {
    hidden: bool,
}

impl CursorGuard {
    pub fn hide(enabled: bool) -> Self {
        let hidden = enabled && write_escape("\x1B[?25l");
        Self { hidden }
    }

    pub fn restore(&mut self) {
        if std::mem::take(&mut self.hidden) {
            write_escape("\x1B[?25h");
        }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn write_escape(sequence: &str) -> bool {
    let mut stdout = io::stdout();
    stdout
        .write_all(sequence.as_bytes())
        .and_then(|_| stdout.flush())
        .is_ok()
}

/// SIGINT and SIGTERM, both meaning "shut down gracefully".
pub struct TerminationSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl TerminationSignals {
    /// Install the handlers. From here on neither signal kills the process
    /// directly; they are only delivered to [`TerminationSignals::recv`].
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }

    /// Resolve on the first signal. Later signals are logged and ignored.
    pub async fn first(mut self) {
        let name = self.recv().await;
        info!(signal = name, "termination signal received");
        tokio::spawn(async move {
            loop {
                let name = self.recv().await;
                warn!(signal = name, "already shutting down, ignoring signal");
            }
        });
    }
}

/// What happened during one [`run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub display_enabled: bool,
    pub device_closed: bool,
    pub phase: Phase,
}

/// Run the board until `shutdown` resolves.
pub async fn run<F, C, S>(
    config: &Config,
    format: PixelFormat,
    feed: F,
    clock: C,
    shutdown: S,
) -> RunSummary
where
    F: DepartureFeed + 'static,
    C: Clock,
    S: Future<Output = ()>,
{
    let mut lifecycle = Lifecycle::new();
    info!(station = %config.station.name, line = %config.station.line, "starting departure board");

    let mut cursor = CursorGuard::hide(config.render.hide_cursor);
    let mut writer = FramebufferWriter::open(
        &config.device.path,
        format,
        config.device.width,
        config.device.height,
    );
    writer.clear(palette::BACKGROUND.into());
    let display_enabled = writer.is_enabled();

    let cache = DepartureCache::new();
    let (stop_tx, stop_rx) = watch::channel(false);
    let poller = tokio::spawn(PollLoop::new(feed, cache.clone(), config).run(stop_rx));

    let composer = FrameComposer::new(config);
    let mut ticker = tokio::time::interval(config.render.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut bytes = Vec::with_capacity(writer.frame_len());
    let mut frames = 0u64;

    lifecycle.mark_running();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let snapshot = cache.snapshot();
                let frame = composer.render(&snapshot, &clock.now());
                format.encode_into(&frame, &mut bytes);
                writer.write_frame(&bytes);
                frames += 1;
            }
        }
    }

    let mut device_closed = false;
    if lifecycle.begin_shutdown() {
        // Stop scheduling fetches; an in-flight one finishes and is discarded
        let _ = stop_tx.send(true);
        if let Err(e) = poller.await {
            warn!(error = %e, "poll loop ended abnormally");
        }
        cursor.restore();
        device_closed = writer.close();
        lifecycle.mark_stopped();
    }

    info!(frames, "departure board stopped");
    RunSummary {
        frames,
        display_enabled,
        device_closed,
        phase: lifecycle.phase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let mut lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.phase(), Phase::Starting);
        assert!(lifecycle.mark_running());
        assert_eq!(lifecycle.phase(), Phase::Running);
        assert!(lifecycle.begin_shutdown());
        assert_eq!(lifecycle.phase(), Phase::ShuttingDown);
        assert!(lifecycle.mark_stopped());
        assert_eq!(lifecycle.phase(), Phase::Stopped);
    }

    #[test]
    fn test_second_shutdown_request_is_ignored() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.mark_running();
        assert!(lifecycle.begin_shutdown());
        assert!(!lifecycle.begin_shutdown());
        lifecycle.mark_stopped();
        assert!(!lifecycle.begin_shutdown());
        assert_eq!(lifecycle.phase(), Phase::Stopped);
    }

    #[test]
    fn test_shutdown_during_startup() {
        let mut lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_shutdown());
        assert!(!lifecycle.mark_running());
        assert_eq!(lifecycle.phase(), Phase::ShuttingDown);
    }

    #[test]
    fn test_out_of_order_transitions_rejected() {
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.mark_stopped());
        assert_eq!(lifecycle.phase(), Phase::Starting);
    }

    #[test]
    fn test_disabled_cursor_guard_is_inert() {
        let mut guard = CursorGuard::hide(false);
        guard.restore();
        assert!(!guard.hidden);
    }
}
