//! Linux framebuffer device writer

use crate::encoder::PixelFormat;
use crate::frame::{Frame, Rgba};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Why the device could not be opened.
#[derive(Error, Debug)]
pub enum FramebufferError {
    #[error("framebuffer device {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied on {}: grant write access, e.g. `sudo usermod -aG video $USER` or `sudo chmod 666 {}`", .path.display(), .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Owns the device handle for the process lifetime.
///
/// If the device cannot be opened the writer stays disabled: every write and
/// clear becomes a no-op and the rest of the board keeps running.
#[derive(Debug)]
pub struct FramebufferWriter {
    device: Option<File>,
    path: PathBuf,
    format: PixelFormat,
    width: u32,
    height: u32,
    failing: bool,
}

impl FramebufferWriter {
    /// Open the device, reporting a failure once and degrading to disabled.
    pub fn open<P: AsRef<Path>>(path: P, format: PixelFormat, width: u32, height: u32) -> Self {
        let path = path.as_ref().to_path_buf();
        let device = match open_device(&path) {
            Ok(file) => {
                info!(device = %path.display(), %format, width, height, "framebuffer opened");
                Some(file)
            }
            Err(e) => {
                error!(error = %e, "framebuffer unavailable, display output disabled");
                None
            }
        };

        Self {
            device,
            path,
            format,
            width,
            height,
            failing: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.device.is_some()
    }

    /// Expected length of a full frame buffer in bytes
    pub fn frame_len(&self) -> usize {
        PixelFormat::frame_len(self.width, self.height)
    }

    /// Overwrite the whole visible area, starting at device offset 0.
    pub fn write_frame(&mut self, bytes: &[u8]) {
        let Some(device) = self.device.as_ref() else {
            return;
        };
        if bytes.len() != self.frame_len() {
            warn!(
                got = bytes.len(),
                expected = self.frame_len(),
                "frame size mismatch, skipping write"
            );
            return;
        }

        match device.write_all_at(bytes, 0) {
            Ok(()) => {
                if self.failing {
                    info!(device = %self.path.display(), "framebuffer writes recovered");
                    self.failing = false;
                }
            }
            Err(e) if self.failing => {
                debug!(error = %e, "framebuffer write failed again");
            }
            Err(e) => {
                warn!(device = %self.path.display(), error = %e, "framebuffer write failed");
                self.failing = true;
            }
        }
    }

    /// Fill the screen with one colour, hiding whatever was left in device memory.
    pub fn clear(&mut self, color: Rgba) {
        if !self.is_enabled() {
            return;
        }
        let frame = Frame::new(self.width, self.height, color);
        let bytes = self.format.encode(&frame);
        self.write_frame(&bytes);
    }

    /// Release the device. Returns true only for the call that actually
    /// closed it, so repeated shutdown paths cannot close twice.
    pub fn close(&mut self) -> bool {
        match self.device.take() {
            Some(file) => {
                drop(file);
                info!(device = %self.path.display(), "framebuffer closed");
                true
            }
            None => false,
        }
    }
}

fn open_device(path: &Path) -> Result<File, FramebufferError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => FramebufferError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => FramebufferError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => FramebufferError::Io {
                path: path.to_path_buf(),
                source,
            },
        })
}
