//! # Pixel Encoding
//!
//! Converts a composed [`Frame`] into the byte layout the framebuffer device
//! expects. Both supported formats use four bytes per pixel, so the output is
//! always `width * height * 4` bytes. Encoding is a plain channel
//! permutation; no colour-space conversion happens here.

use crate::config::ConfigError;
use crate::frame::Frame;
use std::fmt;
use std::str::FromStr;

/// Bytes per pixel for every supported device format
pub const BYTES_PER_PIXEL: usize = 4;

/// Framebuffer pixel layouts, named by byte order in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Blue, green, red, alpha: the usual little-endian XRGB/ARGB fb layout
    Bgra8888,
    /// Red, green, blue, alpha: the frame's own order
    Rgba8888,
}

impl PixelFormat {
    /// Encode a whole frame into a fresh buffer.
    pub fn encode(self, frame: &Frame) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(frame, &mut out);
        out
    }

    /// Encode a whole frame, reusing `out`'s allocation.
    pub fn encode_into(self, frame: &Frame, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(frame.pixels().len() * BYTES_PER_PIXEL);
        match self {
            PixelFormat::Bgra8888 => {
                for p in frame.pixels() {
                    out.extend_from_slice(&[p.b, p.g, p.r, p.a]);
                }
            }
            PixelFormat::Rgba8888 => {
                for p in frame.pixels() {
                    out.extend_from_slice(&[p.r, p.g, p.b, p.a]);
                }
            }
        }
    }

    /// Buffer length for a `width` x `height` frame
    pub fn frame_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }
}

impl FromStr for PixelFormat {
    type Err = ConfigError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BGRA8888" => Ok(PixelFormat::Bgra8888),
            "RGBA8888" => Ok(PixelFormat::Rgba8888),
            _ => Err(ConfigError::UnsupportedPixelFormat(tag.to_string())),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Bgra8888 => f.write_str("BGRA8888"),
            PixelFormat::Rgba8888 => f.write_str("RGBA8888"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgba;

    fn sample_frame() -> Frame {
        let mut frame = Frame::new(3, 2, Rgba::opaque(45, 55, 70));
        frame.set_pixel(0, 0, Rgba { r: 1, g: 2, b: 3, a: 4 });
        frame.set_pixel(2, 1, Rgba::opaque(255, 110, 0));
        frame
    }

    #[test]
    fn test_bgra_permutes_channels() {
        let bytes = PixelFormat::Bgra8888.encode(&sample_frame());
        assert_eq!(&bytes[0..4], &[3, 2, 1, 4]);
        assert_eq!(&bytes[4..8], &[70, 55, 45, 255]);
        assert_eq!(&bytes[20..24], &[0, 110, 255, 255]);
    }

    #[test]
    fn test_rgba_is_identity() {
        let bytes = PixelFormat::Rgba8888.encode(&sample_frame());
        assert_eq!(&bytes[0..4], &[1, 2, 3, 4]);
        assert_eq!(&bytes[20..24], &[255, 110, 0, 255]);
    }

    #[test]
    fn test_length_and_determinism() {
        let frame = Frame::new(480, 360, Rgba::opaque(45, 55, 70));
        let first = PixelFormat::Bgra8888.encode(&frame);
        let second = PixelFormat::Bgra8888.encode(&frame);
        assert_eq!(first.len(), 480 * 360 * 4);
        assert_eq!(first.len(), PixelFormat::frame_len(480, 360));
        assert_eq!(first, second);
    }

    #[test]
    fn test_encode_into_reuses_buffer() {
        let mut out = vec![9u8; 100];
        PixelFormat::Bgra8888.encode_into(&sample_frame(), &mut out);
        assert_eq!(out.len(), 3 * 2 * 4);
        assert_eq!(&out[0..4], &[3, 2, 1, 4]);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!("BGRA8888".parse(), Ok(PixelFormat::Bgra8888));
        assert_eq!("bgra8888".parse(), Ok(PixelFormat::Bgra8888));
        assert_eq!(" RGBA8888 ".parse(), Ok(PixelFormat::Rgba8888));
        assert_eq!(
            "RGB565".parse::<PixelFormat>(),
            Err(ConfigError::UnsupportedPixelFormat("RGB565".to_string()))
        );
        assert_eq!(PixelFormat::Bgra8888.to_string(), "BGRA8888");
    }
}
