//! # Transit Departure Feed
//!
//! Fetches upcoming departures for one stop from a VBB/BVG style REST API
//! (`https://v6.vbb.transport.rest` by default).
//!
//! ## Endpoint
//! `GET {base}/stops/{stationId}/departures?duration={minutes}&results={n}`
//!
//! ## Payload shapes
//! Depending on API version the departures arrive either wrapped,
//! `{"departures": [...]}`, or as a bare array. Both are parsed into
//! [`FeedResponse`] and collapsed into a plain `Vec<Departure>` right here, so
//! callers never care which one the server sent.
//!
//! ## Error Handling
//! Every failure is a [`FeedError`] whose [`FeedError::kind`] names the class
//! (no connectivity, timeout, HTTP status, malformed payload, other). The
//! poll loop logs it and keeps the previous departures.

use crate::config::FeedConfig;
use crate::Departure;
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;

/// Errors that can occur while fetching departures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// DNS failure, refused connection, unreachable host
    #[error("no connectivity: {0}")]
    NoConnectivity(String),

    /// The request did not finish within its timeout
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The body was not one of the accepted JSON shapes
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Anything else the HTTP client reported
    #[error("request failed: {0}")]
    Other(String),
}

impl FeedError {
    /// Short classification used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::NoConnectivity(_) => "no_connectivity",
            FeedError::Timeout => "timeout",
            FeedError::Status(_) => "http_status",
            FeedError::Malformed(_) => "malformed",
            FeedError::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if e.is_connect() {
            FeedError::NoConnectivity(e.to_string())
        } else if e.is_decode() {
            FeedError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            FeedError::Status(status.as_u16())
        } else {
            FeedError::Other(e.to_string())
        }
    }
}

/// Source of departures for a stop.
pub trait DepartureFeed: Send + Sync {
    /// Departures at `station_id` within the next `window_minutes`, at most
    /// `result_limit` of them, in feed order.
    fn fetch(
        &self,
        station_id: &str,
        window_minutes: u32,
        result_limit: u32,
    ) -> impl Future<Output = Result<Vec<Departure>, FeedError>> + Send;
}

#[derive(Debug, Deserialize)]
struct WireLine {
    #[serde(default)]
    name: Option<String>,
}

/// One departure as the API sends it. Everything is optional: a sparse entry
/// is kept (and simply never matches) rather than failing the whole payload.
#[derive(Debug, Deserialize)]
pub struct WireDeparture {
    #[serde(default)]
    line: Option<WireLine>,
    #[serde(default)]
    direction: Option<String>,
    #[serde(default)]
    when: Option<String>,
}

impl From<WireDeparture> for Departure {
    fn from(wire: WireDeparture) -> Self {
        Departure {
            line: wire.line.and_then(|l| l.name).unwrap_or_default(),
            direction: wire.direction.unwrap_or_default(),
            when: wire.when,
        }
    }
}

/// The two accepted top-level response shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeedResponse {
    Wrapped { departures: Vec<WireDeparture> },
    Bare(Vec<WireDeparture>),
}

impl FeedResponse {
    pub fn into_departures(self) -> Vec<Departure> {
        let wire = match self {
            FeedResponse::Wrapped { departures } => departures,
            FeedResponse::Bare(departures) => departures,
        };
        wire.into_iter().map(Departure::from).collect()
    }
}

/// Parse a response body in either accepted shape.
pub fn parse_departures(body: &[u8]) -> Result<Vec<Departure>, FeedError> {
    serde_json::from_slice::<FeedResponse>(body)
        .map(FeedResponse::into_departures)
        .map_err(|e| FeedError::Malformed(e.to_string()))
}

/// HTTPS client for the transit REST API.
#[derive(Clone, Debug)]
pub struct HttpFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeed {
    /// Build a client whose every request is bounded by the configured timeout.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn departures_url(
        &self,
        station_id: &str,
        window_minutes: u32,
        result_limit: u32,
    ) -> String {
        format!(
            "{}/stops/{}/departures?duration={}&results={}",
            self.base_url, station_id, window_minutes, result_limit
        )
    }
}

impl DepartureFeed for HttpFeed {
    async fn fetch(
        &self,
        station_id: &str,
        window_minutes: u32,
        result_limit: u32,
    ) -> Result<Vec<Departure>, FeedError> {
        let url = self.departures_url(station_id, window_minutes, result_limit);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        parse_departures(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAPPED: &str = r#"{
        "departures": [
            {
                "tripId": "1|12345|0|86|1032025",
                "when": "2025-03-01T12:03:00+01:00",
                "plannedWhen": "2025-03-01T12:02:00+01:00",
                "delay": 60,
                "direction": "S+U Osloer Str.",
                "line": { "type": "line", "name": "U9", "product": "subway" }
            },
            {
                "when": null,
                "direction": "S+U Rathaus Steglitz",
                "line": { "name": "U9" },
                "cancelled": true
            },
            {
                "when": "2025-03-01T12:05:00+01:00",
                "direction": "S Südkreuz",
                "line": { "name": "M27" }
            }
        ],
        "realtimeDataUpdatedAt": 1740826800
    }"#;

    const BARE: &str = r#"[
        {
            "when": "2025-03-01T11:03:00Z",
            "direction": "S+U Osloer Str.",
            "line": { "name": "U9" }
        }
    ]"#;

    #[test]
    fn test_parse_wrapped_shape() {
        let deps = parse_departures(WRAPPED.as_bytes()).unwrap();
        assert_eq!(deps.len(), 3);
        assert_eq!(
            deps[0],
            Departure {
                line: "U9".to_string(),
                direction: "S+U Osloer Str.".to_string(),
                when: Some("2025-03-01T12:03:00+01:00".to_string()),
            }
        );
        assert_eq!(deps[1].when, None);
        assert_eq!(deps[2].line, "M27");
    }

    #[test]
    fn test_parse_bare_shape() {
        let deps = parse_departures(BARE.as_bytes()).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].line, "U9");
        assert_eq!(deps[0].when.as_deref(), Some("2025-03-01T11:03:00Z"));
    }

    #[test]
    fn test_both_shapes_parse_identically() {
        let wrapped = format!(r#"{{"departures": {}}}"#, BARE);
        assert_eq!(
            parse_departures(wrapped.as_bytes()).unwrap(),
            parse_departures(BARE.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_sparse_entries_are_kept() {
        let deps = parse_departures(br#"[{}, {"line": {}}, {"direction": "Osloer"}]"#).unwrap();
        assert_eq!(deps.len(), 3);
        assert!(deps.iter().all(|d| d.line.is_empty()));
        assert_eq!(deps[2].direction, "Osloer");
    }

    #[test]
    fn test_malformed_payloads() {
        for body in [
            &b"<html>502 Bad Gateway</html>"[..],
            br#"{"error": "not found"}"#,
            br#"{"departures": 5}"#,
            b"",
        ] {
            let err = parse_departures(body).unwrap_err();
            assert_eq!(err.kind(), "malformed");
        }
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(FeedError::Timeout.kind(), "timeout");
        assert_eq!(FeedError::NoConnectivity("dns".into()).kind(), "no_connectivity");
        assert_eq!(FeedError::Status(503).kind(), "http_status");
        assert_eq!(FeedError::Other("x".into()).kind(), "other");
        assert_eq!(FeedError::Status(503).to_string(), "HTTP status 503");
    }

    #[test]
    fn test_departures_url() {
        let mut config = FeedConfig::default();
        config.base_url = "https://example.test/".to_string();
        let feed = HttpFeed::new(&config).unwrap();
        assert_eq!(
            feed.departures_url("900009101", 60, 50),
            "https://example.test/stops/900009101/departures?duration=60&results=50"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_not_fatal() {
        let mut config = FeedConfig::default();
        // Nothing listens on port 9 of localhost in a test sandbox
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 2;
        let feed = HttpFeed::new(&config).unwrap();
        let err = feed.fetch("900009101", 60, 50).await.unwrap_err();
        assert!(matches!(
            err,
            FeedError::NoConnectivity(_) | FeedError::Timeout | FeedError::Other(_)
        ));
    }
}
