//! Pure Rust collaborators: rendering and baseline encoding.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Parse + render SVG | `resvg` (`usvg::Tree` + `tiny_skia::Pixmap`) |
//! | Font lookup for `<text>` | `usvg::fontdb`, system fonts loaded once |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (baseline, JFIF APP0) |
//!
//! DPI metadata is not this module's concern; the injectors add it to the
//! streams produced here.

use super::backend::{BackendError, BaselineEncoder, PixelBuffer, Rasterizer};
use super::params::{PixelLayout, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::sync::Arc;

/// SVG rasterizer backed by resvg.
///
/// Holds the font database so it is built once and shared across
/// conversions; the type is `Sync` and safe to use from rayon workers.
pub struct ResvgRasterizer {
    fontdb: Arc<fontdb::Database>,
}

impl ResvgRasterizer {
    /// Rasterizer with the system fonts loaded.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} font faces", db.len());
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Rasterizer with no fonts. `<text>` renders nothing.
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(fontdb::Database::new()),
        }
    }

    fn parse(&self, markup: &str) -> Result<usvg::Tree, BackendError> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        usvg::Tree::from_str(markup, &options)
            .map_err(|e| BackendError::ProcessingFailed(format!("Failed to parse SVG: {e}")))
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// tiny-skia stores premultiplied RGBA; undo that for straight alpha.
fn demultiply(premultiplied: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(premultiplied.len());
    for px in premultiplied.chunks_exact(4) {
        let a = px[3] as u32;
        match a {
            0 => rgba.extend_from_slice(&[0, 0, 0, 0]),
            255 => rgba.extend_from_slice(px),
            _ => {
                for &c in &px[..3] {
                    rgba.push(((c as u32 * 255 + a / 2) / a).min(255) as u8);
                }
                rgba.push(a as u8);
            }
        }
    }
    rgba
}

impl Rasterizer for ResvgRasterizer {
    fn render(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        transparent_background: bool,
    ) -> Result<PixelBuffer, BackendError> {
        let tree = self.parse(markup)?;
        let size = tree.size();

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Cannot allocate {width}x{height} canvas"))
        })?;
        if !transparent_background {
            pixmap.fill(Color::WHITE);
        }

        let transform = Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        PixelBuffer::new(width, height, demultiply(pixmap.data()))
    }

    fn natural_size(&self, markup: &str) -> Option<(f64, f64)> {
        let tree = self.parse(markup).ok()?;
        let size = tree.size();
        Some((size.width() as f64, size.height() as f64))
    }
}

/// Baseline PNG/JPEG encoder from the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateEncoder;

impl ImageCrateEncoder {
    pub fn new() -> Self {
        Self
    }
}

fn color_type(layout: PixelLayout) -> ExtendedColorType {
    match layout {
        PixelLayout::Rgb8 => ExtendedColorType::Rgb8,
        PixelLayout::Rgba8 => ExtendedColorType::Rgba8,
    }
}

impl BaselineEncoder for ImageCrateEncoder {
    fn encode_png(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(pixels, width, height, color_type(layout))
            .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {e}")))?;
        Ok(out)
    }

    fn encode_jpeg(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality.to_jpeg_scale())
            .write_image(rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))?;
        Ok(out)
    }
}
