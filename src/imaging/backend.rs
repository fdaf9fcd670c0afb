//! Collaborator traits and the pixel buffer passed between them.
//!
//! The codec core never renders vector markup or entropy-codes pixels
//! itself. Those jobs sit behind two traits:
//!
//! - [`Rasterizer`] turns SVG markup into an RGBA8 [`PixelBuffer`].
//! - [`BaselineEncoder`] turns pixels into a plain PNG or JPEG stream, which
//!   the metadata injectors then annotate.
//!
//! The production implementations live in
//! [`rust_backend`](super::rust_backend). Tests swap in the recording mocks
//! from [`tests`] so the injection logic runs against synthetic fixtures.

use super::params::{PixelLayout, Quality};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pixel buffer for {width}x{height} must hold {expected} bytes, got {actual}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel size of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// RGBA8 pixels, row-major, no row padding.
///
/// The length invariant (`width * height * 4`) is checked on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BackendError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(BackendError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Renders SVG markup into pixels.
///
/// Implementations must fail rather than hand back a blank buffer when the
/// markup cannot be rendered.
pub trait Rasterizer: Sync {
    /// Render `markup` scaled to exactly `width` x `height` pixels.
    ///
    /// With `transparent_background` false the canvas starts white instead
    /// of fully transparent.
    fn render(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        transparent_background: bool,
    ) -> Result<PixelBuffer, BackendError>;

    /// Intrinsic size of the markup in user units, when the rasterizer can
    /// determine one. Used only when the root element declares neither
    /// `width`/`height` nor `viewBox`.
    fn natural_size(&self, _markup: &str) -> Option<(f64, f64)> {
        None
    }
}

/// Produces standards-conforming PNG/JPEG streams with no resolution
/// metadata of their own concern.
pub trait BaselineEncoder: Sync {
    fn encode_png(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Vec<u8>, BackendError>;

    /// Encode tightly packed RGB24 pixels.
    fn encode_jpeg(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
