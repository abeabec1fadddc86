//! # Shape and Text Painting
//!
//! The [`Rasterizer`] trait is everything the composer needs from a graphics
//! backend: filled rectangles, filled rounded rectangles, stroked lines and
//! baseline-anchored text. [`Frame`] implements it on top of
//! embedded-graphics.
//!
//! embedded-graphics ships bitmap fonts up to 20 px tall, while the board
//! layout asks for text up to 52 px. Text is therefore drawn with the mono
//! font whose ascent, multiplied by a small integer factor, lands closest to
//! the requested size, through a target that blows every font pixel up into a
//! `scale` x `scale` block. Mono glyphs are wide, so candidates whose advance
//! would exceed a proportional face's digit width are skipped; otherwise
//! two-digit countdowns run into the "min" label next to them.

use crate::frame::Frame;
use embedded_graphics::mono_font::iso_8859_1::{
    FONT_10X20, FONT_6X13, FONT_6X13_BOLD, FONT_7X14, FONT_7X14_BOLD, FONT_9X15, FONT_9X15_BOLD,
    FONT_9X18, FONT_9X18_BOLD,
};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle, RoundedRectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

/// Largest integer blow-up applied to a bitmap font
const MAX_SCALE: u32 = 4;

/// Glyph advance budget as a fraction of the requested size, roughly the
/// digit width of a bold proportional face
pub const ADVANCE_NUMERATOR: u32 = 11;
pub const ADVANCE_DENOMINATOR: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// How a run of text should look and where it hangs off its anchor point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSpec {
    /// Requested glyph height in pixels
    pub size: u32,
    pub weight: FontWeight,
    pub color: Rgb888,
    pub alignment: Alignment,
    pub baseline: Baseline,
}

impl TextSpec {
    /// Bold, left aligned, anchored on the alphabetic baseline
    pub fn bold(size: u32, color: Rgb888) -> Self {
        Self {
            size,
            weight: FontWeight::Bold,
            color,
            alignment: Alignment::Left,
            baseline: Baseline::Alphabetic,
        }
    }

    pub fn aligned(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn anchored(mut self, baseline: Baseline) -> Self {
        self.baseline = baseline;
        self
    }
}

/// Painting primitives used by the frame composer.
pub trait Rasterizer {
    fn fill_rect(&mut self, area: Rectangle, color: Rgb888);
    fn fill_rounded_rect(&mut self, area: Rectangle, radius: u32, color: Rgb888);
    fn stroke_line(&mut self, start: Point, end: Point, width: u32, color: Rgb888);
    fn text(&mut self, text: &str, position: Point, spec: &TextSpec);
}

impl Rasterizer for Frame {
    fn fill_rect(&mut self, area: Rectangle, color: Rgb888) {
        area.into_styled(PrimitiveStyle::with_fill(color)).draw(self).ok();
    }

    fn fill_rounded_rect(&mut self, area: Rectangle, radius: u32, color: Rgb888) {
        RoundedRectangle::with_equal_corners(area, Size::new(radius, radius))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(self)
            .ok();
    }

    fn stroke_line(&mut self, start: Point, end: Point, width: u32, color: Rgb888) {
        Line::new(start, end)
            .into_styled(PrimitiveStyle::with_stroke(color, width))
            .draw(self)
            .ok();
    }

    fn text(&mut self, text: &str, position: Point, spec: &TextSpec) {
        let (font, scale) = pick_font(spec.size, spec.weight);
        let text = printable(text);
        let character_style = MonoTextStyle::new(font, spec.color);
        let text_style = TextStyleBuilder::new()
            .alignment(spec.alignment)
            .baseline(spec.baseline)
            .build();

        let mut target = ScaledTarget {
            frame: self,
            origin: position,
            scale,
        };
        Text::with_text_style(&text, Point::zero(), character_style, text_style)
            .draw(&mut target)
            .ok();
    }
}

/// Font and integer scale whose ascent lands closest to `size` pixels, among
/// those whose glyphs are no wider than [`ADVANCE_NUMERATOR`]/[`ADVANCE_DENOMINATOR`]
/// of `size`. Falls back to the smallest font when nothing fits.
pub fn pick_font(size: u32, weight: FontWeight) -> (&'static MonoFont<'static>, u32) {
    let candidates: &[&'static MonoFont<'static>] = match weight {
        FontWeight::Bold => &[&FONT_9X18_BOLD, &FONT_9X15_BOLD, &FONT_7X14_BOLD, &FONT_6X13_BOLD],
        FontWeight::Regular => &[&FONT_10X20, &FONT_9X18, &FONT_9X15, &FONT_7X14, &FONT_6X13],
    };

    let mut best = (candidates[candidates.len() - 1], 1);
    let mut best_error = u32::MAX;
    for scale in 1..=MAX_SCALE {
        for &font in candidates {
            if !fits_width(font, scale, size) {
                continue;
            }
            let error = (ascent(font) * scale).abs_diff(size);
            if error < best_error {
                best = (font, scale);
                best_error = error;
            }
        }
    }
    best
}

/// Rows from the top of a glyph cell down to and including the baseline
pub fn ascent(font: &MonoFont<'_>) -> u32 {
    font.baseline + 1
}

fn fits_width(font: &MonoFont<'_>, scale: u32, size: u32) -> bool {
    font.character_size.width * scale * ADVANCE_DENOMINATOR <= size * ADVANCE_NUMERATOR
}

/// Swap characters the bitmap fonts cannot draw for close look-alikes.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '→' => '>',
            '←' => '<',
            '–' | '—' => '-',
            other => other,
        })
        .collect()
}

/// Draw target that maps each logical pixel to a `scale` x `scale` block of
/// the frame, with logical (0, 0) at `origin`.
struct ScaledTarget<'a> {
    frame: &'a mut Frame,
    origin: Point,
    scale: u32,
}

impl Dimensions for ScaledTarget<'_> {
    fn bounding_box(&self) -> Rectangle {
        let s = self.scale as i32;
        let top_left = Point::new(-self.origin.x / s - 1, -self.origin.y / s - 1);
        let size = Size::new(
            self.frame.width() / self.scale + 2,
            self.frame.height() / self.scale + 2,
        );
        Rectangle::new(top_left, size)
    }
}

impl DrawTarget for ScaledTarget<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let block = Size::new(self.scale, self.scale);
        for Pixel(point, color) in pixels {
            let top_left = self.origin + point * self.scale as i32;
            self.frame.fill_solid(&Rectangle::new(top_left, block), color)?;
        }
        Ok(())
    }
}
