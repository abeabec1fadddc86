//! # Departure Board Core Library
//!
//! This library provides the building blocks of a framebuffer departure
//! display: a small daemon that polls a public transit API for one stop and
//! paints the next trains of one line onto a raw Linux framebuffer, once per
//! second, on hardware as small as a Raspberry Pi Zero.
//!
//! ## Design Philosophy
//!
//! ### Two loops, one shared value
//! - **Poll loop** ([`poller`]): slow, network-bound, allowed to fail. Every
//!   success replaces the whole [`cache::DepartureCache`] contents at once.
//! - **Render loop** ([`lifecycle`]): fast, never touches the network. Each
//!   tick takes a snapshot of the cache, composes a [`frame::Frame`], encodes
//!   it for the device and writes it.
//!
//! The loops only meet in the cache, which hands out immutable snapshots, so
//! a reader never observes a half-replaced list.
//!
//! ### Data Flow
//! 1. **Fetch**: [`feed::HttpFeed`] asks the API for departures at the stop
//! 2. **Filter**: only the configured line survives and is cached
//! 3. **Compose**: [`composer::FrameComposer`] decides what goes where
//! 4. **Rasterize**: [`raster::Rasterizer`] paints shapes and text into the frame
//! 5. **Encode**: [`encoder::PixelFormat`] permutes channels into device order
//! 6. **Write**: [`framebuffer::FramebufferWriter`] overwrites the visible area
//!
//! ## Core Types
//!
//! - [`Departure`]: one train leaving the stop, as reported by the feed

use serde::{Deserialize, Serialize};

pub mod ascii;
pub mod cache;
pub mod composer;
pub mod config;
pub mod encoder;
pub mod feed;
pub mod frame;
pub mod framebuffer;
pub mod lifecycle;
pub mod poller;
pub mod raster;
pub mod time_math;

/// A single departure reported by the transit feed.
///
/// Departures are immutable once received. They live in the cache until the
/// next successful poll replaces the whole list.
///
/// The timestamp is kept as the feed's original string and only parsed when a
/// countdown is needed, so a malformed value degrades one badge instead of a
/// whole poll.
///
/// # Example
/// ```
/// use departure_board_lib::Departure;
///
/// let dep = Departure {
///     line: "U9".to_string(),
///     direction: "S+U Osloer Str.".to_string(),
///     when: Some("2025-03-01T12:03:30+01:00".to_string()),
/// };
///
/// assert!(dep.heads_towards(&["Osloer".to_string()]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Departure {
    /// Line identifier as shown on the badge, e.g. "U9"
    pub line: String,
    /// Free-text destination label, e.g. "S+U Rathaus Steglitz"
    pub direction: String,
    /// Real-time (or scheduled) departure instant, ISO-8601. `None` for
    /// cancelled trips the feed still lists.
    pub when: Option<String>,
}

impl Departure {
    /// True if the direction label contains any of the given substrings.
    pub fn heads_towards(&self, needles: &[String]) -> bool {
        needles
            .iter()
            .any(|needle| !needle.is_empty() && self.direction.contains(needle.as_str()))
    }
}
