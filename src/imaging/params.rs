//! Parameter types for conversions.
//!
//! These are validated on construction, so anything holding a [`Dpi`] or a
//! [`Quality`] can rely on the value being in range.
//!
//! ## Types
//!
//! - [`Dpi`]: Target resolution, 1–2400. 72 DPI is "1× scale".
//! - [`Quality`]: Lossy encoding quality, 0.0–1.0, mapped to 1–100 for JPEG.
//! - [`PixelLayout`]: Channel layout of a tightly packed 8-bit buffer.
//! - [`ImageMetadata`]: Fields shared by the EXIF and TIFF tag tables.

use super::error::ConvertError;

/// Resolution that defines 1× scale: one SVG user unit becomes one pixel.
pub const BASELINE_DPI: u32 = 72;

/// Highest accepted resolution.
pub const MAX_DPI: u32 = 2400;

/// Target resolution in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dpi(u32);

impl Dpi {
    pub fn new(value: u32) -> Result<Self, ConvertError> {
        if value == 0 || value > MAX_DPI {
            return Err(ConvertError::InvalidDpi(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Dpi {
    fn default() -> Self {
        Self(BASELINE_DPI)
    }
}

/// Quality setting for lossy encoding (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality(f32);

impl Quality {
    pub fn new(value: f32) -> Result<Self, ConvertError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConvertError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the JPEG encoder's 1–100 scale.
    pub fn to_jpeg_scale(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.92)
    }
}

/// Channel layout of an 8-bit interleaved pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

/// Descriptive fields written into EXIF and TIFF tag tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata<'a> {
    pub dpi: Dpi,
    /// `Software` tag.
    pub software: &'a str,
    /// `DateTime` tag, `YYYY:MM:DD HH:MM:SS`.
    pub datetime: &'a str,
}
