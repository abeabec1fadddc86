//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! departure-config.toml file. Every option has a default, so a missing,
//! partial or broken file still produces a working board for Amrumer Straße
//! on a 480x360 BGRA framebuffer.
//!
//! Only [`Config::validate`] can reject a configuration, and it runs once at
//! startup before any loop is spawned.

use crate::encoder::PixelFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "departure-config.toml";

/// Startup-time configuration problems. These are the only fatal errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported pixel format {0:?} (supported: BGRA8888, RGBA8888)")]
    UnsupportedPixelFormat(String),

    #[error("invalid display size {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("{0} must be greater than zero")]
    ZeroPeriod(&'static str),

    #[error("expected exactly 2 directions, found {0}")]
    DirectionCount(usize),
}

/// Application configuration loaded from departure-config.toml
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Framebuffer device and its pixel layout
    pub device: DeviceConfig,
    /// Which stop and line to show
    pub station: StationConfig,
    /// Transit API access
    pub feed: FeedConfig,
    /// Render loop settings
    pub render: RenderConfig,
    /// The two direction sections, top to bottom
    pub directions: Vec<DirectionConfig>,
}

/// Framebuffer device description. Width and height must match the panel.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device node, e.g. "/dev/fb0"
    pub path: String,
    /// Pixel format tag, e.g. "BGRA8888"
    pub format: String,
    /// Visible width in pixels
    pub width: u32,
    /// Visible height in pixels
    pub height: u32,
}

/// Transit stop configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// Stop id in the transit API (look it up via `/locations?query=...`)
    pub id: String,
    /// Name printed in the header band
    pub name: String,
    /// Line identifier to keep, everything else is dropped
    pub line: String,
}

/// Transit API configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// API root without trailing slash
    pub base_url: String,
    /// How far ahead to ask for departures
    pub window_minutes: u32,
    /// Maximum number of departures per request
    pub result_limit: u32,
    /// Upper bound for one request, independent of the poll period
    pub timeout_secs: u64,
    /// Time between fetch attempts
    pub poll_period_secs: u64,
}

/// Render loop configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Time between frames
    pub period_ms: u64,
    /// Hide the console cursor while the board runs
    pub hide_cursor: bool,
}

/// One direction section of the board
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DirectionConfig {
    /// Section heading, e.g. "→ Osloer Straße"
    pub heading: String,
    /// A departure belongs here if its direction contains any of these
    pub matches: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DeviceConfig::default(),
            station: StationConfig::default(),
            feed: FeedConfig::default(),
            render: RenderConfig::default(),
            directions: default_directions(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            path: "/dev/fb0".to_string(),
            format: "BGRA8888".to_string(),
            width: 480,
            height: 360,
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            id: "900009101".to_string(),
            name: "Amrumer Straße".to_string(),
            line: "U9".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            base_url: "https://v6.vbb.transport.rest".to_string(),
            window_minutes: 60,
            result_limit: 50,
            timeout_secs: 10,
            poll_period_secs: 20,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            period_ms: 1000,
            hide_cursor: true,
        }
    }
}

/// Osloer Straße on top, Rathaus Steglitz below
pub fn default_directions() -> Vec<DirectionConfig> {
    vec![
        DirectionConfig {
            heading: "→ Osloer Straße".to_string(),
            matches: vec!["Osloer".to_string()],
        },
        DirectionConfig {
            heading: "→ Rathaus Steglitz".to_string(),
            matches: vec!["Steglitz".to_string(), "Rathaus".to_string()],
        },
    ]
}

impl FeedConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }
}

impl RenderConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Config {
    /// Load configuration from departure-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        station = %config.station.name,
                        "loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "invalid config file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        };

        if config.directions.is_empty() {
            config.directions = default_directions();
        }
        config
    }

    /// Check the parts that must agree with the physical device and resolve
    /// the pixel format. Called once before anything is started.
    pub fn validate(&self) -> Result<PixelFormat, ConfigError> {
        let format: PixelFormat = self.device.format.parse()?;

        if self.device.width == 0 || self.device.height == 0 {
            return Err(ConfigError::InvalidDimensions {
                width: self.device.width,
                height: self.device.height,
            });
        }
        if self.feed.poll_period_secs == 0 {
            return Err(ConfigError::ZeroPeriod("feed.poll_period_secs"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::ZeroPeriod("feed.timeout_secs"));
        }
        if self.render.period_ms == 0 {
            return Err(ConfigError::ZeroPeriod("render.period_ms"));
        }
        if self.directions.len() != 2 {
            return Err(ConfigError::DirectionCount(self.directions.len()));
        }

        Ok(format)
    }
}
