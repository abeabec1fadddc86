//! # Frame Composition
//!
//! Lays out one complete board from a cache snapshot and the current time:
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ [U]  Amrumer Straße                12:34 │  yellow header band
//! ├──────────────────────────────────────────┤
//! │ → Osloer Straße                          │
//! │ [U9]                          3 min      │  next train
//! │                                 9 min    │  the one after
//! │ ──────────────────────────────────────── │
//! │ → Rathaus Steglitz                       │
//! │ [U9]                          5 min      │
//! │                                14 min    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! Coordinates, sizes and colours are tuned for the 480x360 panel and are a
//! contract with the physical display. Right-hand elements are anchored to
//! the frame width. The composer decides content, position and colour; the
//! [`Rasterizer`] does the painting.

use crate::config::{Config, DirectionConfig};
use crate::frame::Frame;
use crate::raster::{Rasterizer, TextSpec};
use crate::time_math::Countdown;
use crate::Departure;
use chrono::{DateTime, TimeZone};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Alignment, Baseline};
use std::fmt::Display;

/// Board colours
pub mod palette {
    use embedded_graphics::pixelcolor::Rgb888;

    pub const BACKGROUND: Rgb888 = Rgb888::new(45, 55, 70);
    pub const YELLOW: Rgb888 = Rgb888::new(255, 220, 0);
    pub const WHITE: Rgb888 = Rgb888::new(255, 255, 255);
    pub const GRAY: Rgb888 = Rgb888::new(130, 130, 130);
    pub const STATION_BLUE: Rgb888 = Rgb888::new(0, 80, 160);
    pub const U9_ORANGE: Rgb888 = Rgb888::new(255, 110, 0);
}

/// Departures shown per direction
pub const DEPARTURES_PER_DIRECTION: usize = 2;

const HEADER_HEIGHT: u32 = 70;
const SYMBOL_X: i32 = 15;
const SYMBOL_Y: i32 = 10;
const SYMBOL_SIZE: u32 = 50;
const STATION_NAME_X: i32 = SYMBOL_X + SYMBOL_SIZE as i32 + 25;
const HEADER_BASELINE: i32 = 50;
const CLOCK_FROM_RIGHT: i32 = 90;

/// Baseline of the first section heading; later sections follow at a fixed pitch
const SECTION_TOP: i32 = 120;
const SECTION_PITCH: i32 = 130;
const SECTION_X: i32 = 15;
const DIVIDER_BELOW_TOP: i32 = 100;

const PRIMARY_BELOW_TOP: i32 = 45;
const SECONDARY_BELOW_TOP: i32 = 80;
const PRIMARY_MINUTES_FROM_RIGHT: i32 = 145;
const SECONDARY_MINUTES_FROM_RIGHT: i32 = 125;
const UNIT_FROM_RIGHT: i32 = 85;

/// Badge fill per line, falling back to a neutral grey for unknown lines.
pub fn badge_color(line: &str) -> Rgb888 {
    match line {
        "U1" => Rgb888::new(125, 173, 76),
        "U2" => Rgb888::new(218, 66, 30),
        "U3" => Rgb888::new(22, 104, 61),
        "U4" => Rgb888::new(240, 215, 34),
        "U5" => Rgb888::new(126, 83, 48),
        "U6" => Rgb888::new(140, 109, 171),
        "U7" => Rgb888::new(82, 141, 186),
        "U8" => Rgb888::new(34, 79, 134),
        "U9" => palette::U9_ORANGE,
        _ => Rgb888::new(90, 90, 90),
    }
}

/// First departures in cache order whose direction matches, at most
/// [`DEPARTURES_PER_DIRECTION`]. Anything beyond that is not shown.
pub fn upcoming<'a>(
    departures: &'a [Departure],
    direction: &DirectionConfig,
) -> Vec<&'a Departure> {
    departures
        .iter()
        .filter(|d| d.heads_towards(&direction.matches))
        .take(DEPARTURES_PER_DIRECTION)
        .collect()
}

/// Builds board frames for one configured station and display.
#[derive(Clone, Debug)]
pub struct FrameComposer {
    width: u32,
    height: u32,
    station_name: String,
    directions: Vec<DirectionConfig>,
}

impl FrameComposer {
    pub fn new(config: &Config) -> Self {
        Self {
            width: config.device.width,
            height: config.device.height,
            station_name: config.station.name.clone(),
            directions: config.directions.clone(),
        }
    }

    /// Compose a fresh frame from a snapshot.
    pub fn render<Tz>(&self, departures: &[Departure], now: &DateTime<Tz>) -> Frame
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut frame = Frame::new(self.width, self.height, palette::BACKGROUND.into());
        self.compose(departures, now, &mut frame);
        frame
    }

    /// Paint the whole board onto `raster`.
    pub fn compose<Tz, R>(&self, departures: &[Departure], now: &DateTime<Tz>, raster: &mut R)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
        R: Rasterizer,
    {
        raster.fill_rect(
            Rectangle::new(Point::zero(), Size::new(self.width, self.height)),
            palette::BACKGROUND,
        );
        self.draw_header(now, raster);

        for (index, direction) in self.directions.iter().enumerate() {
            let top = SECTION_TOP + SECTION_PITCH * index as i32;
            if index > 0 {
                let y = top - SECTION_PITCH + DIVIDER_BELOW_TOP;
                raster.stroke_line(
                    Point::new(10, y),
                    Point::new(self.width as i32 - 10, y),
                    2,
                    palette::YELLOW,
                );
            }
            self.draw_section(top, direction, departures, now, raster);
        }
    }

    fn draw_header<Tz, R>(&self, now: &DateTime<Tz>, raster: &mut R)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
        R: Rasterizer,
    {
        raster.fill_rect(
            Rectangle::new(Point::zero(), Size::new(self.width, HEADER_HEIGHT)),
            palette::YELLOW,
        );

        // Station symbol: white "U" on a blue tile
        raster.fill_rounded_rect(
            Rectangle::new(
                Point::new(SYMBOL_X, SYMBOL_Y),
                Size::new(SYMBOL_SIZE, SYMBOL_SIZE),
            ),
            6,
            palette::STATION_BLUE,
        );
        let half = SYMBOL_SIZE as i32 / 2;
        raster.text(
            "U",
            Point::new(SYMBOL_X + half, SYMBOL_Y + half + 2),
            &TextSpec::bold(38, palette::WHITE)
                .aligned(Alignment::Center)
                .anchored(Baseline::Middle),
        );

        raster.text(
            &self.station_name,
            Point::new(STATION_NAME_X, HEADER_BASELINE),
            &TextSpec::bold(28, palette::BACKGROUND),
        );

        let clock = now.format("%H:%M").to_string();
        raster.text(
            &clock,
            Point::new(self.width as i32 - CLOCK_FROM_RIGHT, HEADER_BASELINE),
            &TextSpec::bold(26, palette::BACKGROUND),
        );
    }

    fn draw_section<Tz, R>(
        &self,
        top: i32,
        direction: &DirectionConfig,
        departures: &[Departure],
        now: &DateTime<Tz>,
        raster: &mut R,
    ) where
        Tz: TimeZone,
        R: Rasterizer,
    {
        raster.text(
            &direction.heading,
            Point::new(SECTION_X, top),
            &TextSpec::bold(26, palette::YELLOW),
        );

        let matches = upcoming(departures, direction);
        let right = self.width as i32;

        if let Some(first) = matches.first() {
            self.draw_badge(top, &first.line, raster);

            let baseline = top + PRIMARY_BELOW_TOP;
            raster.text(
                &Countdown::of(first, now).to_string(),
                Point::new(right - PRIMARY_MINUTES_FROM_RIGHT, baseline),
                &TextSpec::bold(52, palette::YELLOW),
            );
            raster.text(
                "min",
                Point::new(right - UNIT_FROM_RIGHT, baseline),
                &TextSpec::bold(36, palette::WHITE),
            );
        }

        if let Some(second) = matches.get(1) {
            let baseline = top + SECONDARY_BELOW_TOP;
            raster.text(
                &Countdown::of(second, now).to_string(),
                Point::new(right - SECONDARY_MINUTES_FROM_RIGHT, baseline),
                &TextSpec::bold(36, palette::YELLOW),
            );
            raster.text(
                "min",
                Point::new(right - UNIT_FROM_RIGHT, baseline),
                &TextSpec::bold(24, palette::GRAY),
            );
        }
    }

    /// White-rimmed rounded badge with the line name.
    fn draw_badge<R: Rasterizer>(&self, top: i32, line: &str, raster: &mut R) {
        raster.fill_rounded_rect(
            Rectangle::new(Point::new(SECTION_X, top + 10), Size::new(75, 45)),
            6,
            palette::WHITE,
        );
        raster.fill_rounded_rect(
            Rectangle::new(Point::new(SECTION_X + 3, top + 13), Size::new(69, 39)),
            5,
            badge_color(line),
        );
        raster.text(
            line,
            Point::new(SECTION_X + 10, top + PRIMARY_BELOW_TOP),
            &TextSpec::bold(32, palette::WHITE),
        );
    }
}
