//! # Departure Polling
//!
//! Keeps the [`DepartureCache`] fresh without ever involving the render path.
//!
//! - The first fetch happens immediately, later ones every poll period.
//! - Each fetch is bounded by the request timeout, independent of the period.
//! - Success: keep only the configured line and replace the cache in one go.
//! - Failure: log the classification and leave the cache alone.
//! - Shutdown is cooperative. A fetch already in flight runs to completion
//!   and its result is dropped, so nothing reaches the cache after shutdown.

use crate::cache::DepartureCache;
use crate::config::Config;
use crate::feed::{DepartureFeed, FeedError};
use crate::Departure;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodic fetcher feeding one cache.
pub struct PollLoop<F> {
    feed: F,
    cache: DepartureCache,
    station_id: String,
    line: String,
    window_minutes: u32,
    result_limit: u32,
    timeout: Duration,
    period: Duration,
}

impl<F: DepartureFeed> PollLoop<F> {
    pub fn new(feed: F, cache: DepartureCache, config: &Config) -> Self {
        Self {
            feed,
            cache,
            station_id: config.station.id.clone(),
            line: config.station.line.clone(),
            window_minutes: config.feed.window_minutes,
            result_limit: config.feed.result_limit,
            timeout: config.feed.request_timeout(),
            period: config.feed.poll_period(),
        }
    }

    /// Fetch once and keep only the configured line. Does not touch the cache.
    pub async fn fetch_filtered(&self) -> Result<Vec<Departure>, FeedError> {
        let request = self
            .feed
            .fetch(&self.station_id, self.window_minutes, self.result_limit);
        let departures = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FeedError::Timeout)??;

        Ok(departures
            .into_iter()
            .filter(|d| d.line == self.line)
            .collect())
    }

    /// Fetch once and update the cache on success.
    pub async fn poll_once(&self) -> Result<usize, FeedError> {
        let result = self.fetch_filtered().await;
        self.apply(result)
    }

    fn apply(&self, result: Result<Vec<Departure>, FeedError>) -> Result<usize, FeedError> {
        match result {
            Ok(departures) => {
                let count = departures.len();
                self.cache.replace(departures);
                info!(line = %self.line, count, "departures updated");
                Ok(count)
            }
            Err(e) => {
                warn!(
                    kind = e.kind(),
                    error = %e,
                    "departure poll failed, keeping cached departures"
                );
                Err(e)
            }
        }
    }

    /// Poll until `shutdown` flips to true or its sender goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            station = %self.station_id,
            line = %self.line,
            period = ?self.period,
            "poll loop started"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let result = self.fetch_filtered().await;
            if *shutdown.borrow() {
                debug!("shutdown requested during fetch, discarding result");
                break;
            }
            // Failures are logged inside apply and never end the loop
            let _ = self.apply(result);
        }

        info!("poll loop stopped");
    }
}
