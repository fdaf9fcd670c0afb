//! Conversion orchestration.
//!
//! [`convert_with_backend`] validates the request, resolves the pixel size,
//! asks the [`Rasterizer`] for pixels, and hands them to the encoder for the
//! requested format:
//!
//! ```text
//! PNG   composite ─ BaselineEncoder::encode_png ─ png_meta::inject_dpi
//! JPEG  composite ─ BaselineEncoder::encode_jpeg ─ insert_exif ─ patch_jfif_density
//! TIFF  tiff::encode_tiff (composites itself)
//! ```
//!
//! Metadata failures that leave a usable image are reported as
//! [`ConvertWarning`]s. Every other failure after validation is wrapped
//! with the stage and format it came from.

use super::backend::{BaselineEncoder, PixelBuffer, Rasterizer};
use super::calculations::{exif_datetime_now, resolve_pixel_size};
use super::compositor::composite;
use super::error::{ConvertError, Stage};
use super::exif::exif_payload;
use super::jpeg_meta::{insert_exif, patch_jfif_density};
use super::params::{Dpi, ImageMetadata, Quality};
use super::png_meta::inject_dpi;
use super::rust_backend::{ImageCrateEncoder, ResvgRasterizer};
use super::svg::{SvgRoot, parse_root};
use super::tiff::encode_tiff;
use crate::types::{Conversion, ConvertWarning, EncodedArtifact, OutputFormat};
use std::sync::LazyLock;

/// Longest `Software` value written; longer values are cut.
pub const MAX_SOFTWARE_LEN: usize = 255;

/// Value of the `Software` tag unless overridden.
pub fn default_software() -> String {
    format!("svg-export {}", env!("CARGO_PKG_VERSION"))
}

/// One conversion request, as received from a caller.
///
/// Fields are raw values; [`convert_with_backend`] validates them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// `png`, `jpg`/`jpeg`, or `tiff`/`tif`.
    pub format: String,
    pub dpi: u32,
    /// JPEG quality in `[0, 1]`. Validated for every format.
    pub quality: f32,
    /// Keep transparency (PNG and TIFF). Ignored for JPEG.
    pub transparent: bool,
    pub software: String,
    /// Fixed `DateTime` value; the current UTC time when `None`.
    pub timestamp: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png.to_string(),
            dpi: 300,
            quality: Quality::default().value(),
            transparent: true,
            software: default_software(),
            timestamp: None,
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub root: SvgRoot,
    pub format: OutputFormat,
    pub dpi: Dpi,
    pub quality: Quality,
}

/// Check the request in a fixed order: markup, format, DPI, quality.
pub fn validate(markup: &str, options: &ConvertOptions) -> Result<ValidatedRequest, ConvertError> {
    let root = parse_root(markup)?;
    let format: OutputFormat = options.format.parse()?;
    let dpi = Dpi::new(options.dpi)?;
    let quality = Quality::new(options.quality)?;
    Ok(ValidatedRequest {
        root,
        format,
        dpi,
        quality,
    })
}

static DEFAULT_RASTERIZER: LazyLock<ResvgRasterizer> = LazyLock::new(ResvgRasterizer::new);

/// Convert with the built-in resvg rasterizer and image-crate encoder.
pub fn convert(markup: &str, options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    convert_with_backend(&*DEFAULT_RASTERIZER, &ImageCrateEncoder, markup, options)
}

/// Convert `markup` using the given collaborators.
pub fn convert_with_backend(
    rasterizer: &impl Rasterizer,
    encoder: &impl BaselineEncoder,
    markup: &str,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let request = validate(markup, options)?;
    let format = request.format;

    let size = match resolve_pixel_size(&request.root, None, request.dpi) {
        Err(ConvertError::DimensionUnavailable) => {
            resolve_pixel_size(&request.root, rasterizer.natural_size(markup), request.dpi)
        }
        other => other,
    }?;
    log::debug!(
        "rasterizing at {}x{} ({} dpi) for {}",
        size.width,
        size.height,
        request.dpi.value(),
        format
    );

    let transparent = options.transparent && format.supports_alpha();
    let buffer = rasterizer
        .render(markup, size.width, size.height, transparent)
        .map_err(|e| ConvertError::RasterizationFailed(e).in_stage(Stage::Rasterize, format))?;

    let software: String = options.software.chars().take(MAX_SOFTWARE_LEN).collect();
    let datetime = options.timestamp.clone().unwrap_or_else(exif_datetime_now);
    let meta = ImageMetadata {
        dpi: request.dpi,
        software: &software,
        datetime: &datetime,
    };

    let mut warnings = Vec::new();
    let data = match format {
        OutputFormat::Png => {
            encode_png(encoder, &buffer, transparent, request.dpi, &mut warnings)?
        }
        OutputFormat::Jpeg => {
            encode_jpeg(encoder, &buffer, request.quality, &meta, &mut warnings)?
        }
        OutputFormat::Tiff => encode_tiff(&buffer, transparent, &meta)
            .map_err(|e| e.in_stage(Stage::Encode, format))?,
    };

    Ok(Conversion {
        artifact: EncodedArtifact::new(data, format),
        width: buffer.width(),
        height: buffer.height(),
        warnings,
    })
}

fn encode_png(
    encoder: &impl BaselineEncoder,
    buffer: &PixelBuffer,
    transparent: bool,
    dpi: Dpi,
    warnings: &mut Vec<ConvertWarning>,
) -> Result<Vec<u8>, ConvertError> {
    let format = OutputFormat::Png;
    let pixels = composite(buffer, transparent);
    let png = encoder
        .encode_png(&pixels.data, buffer.width(), buffer.height(), pixels.layout)
        .map_err(|source| {
            ConvertError::EncodeFailed { format, source }.in_stage(Stage::Encode, format)
        })?;

    let annotated = inject_dpi(&png, dpi);
    recover(annotated, png, format, warnings)
}

fn encode_jpeg(
    encoder: &impl BaselineEncoder,
    buffer: &PixelBuffer,
    quality: Quality,
    meta: &ImageMetadata<'_>,
    warnings: &mut Vec<ConvertWarning>,
) -> Result<Vec<u8>, ConvertError> {
    let format = OutputFormat::Jpeg;
    let rgb = composite(buffer, false);
    let jpeg = encoder
        .encode_jpeg(&rgb.data, buffer.width(), buffer.height(), quality)
        .map_err(|source| {
            ConvertError::EncodeFailed { format, source }.in_stage(Stage::Encode, format)
        })?;

    let with_exif = insert_exif(&jpeg, &exif_payload(meta));
    let with_exif = recover(with_exif, jpeg, format, warnings)?;

    let with_jfif = patch_jfif_density(&with_exif, meta.dpi);
    recover(with_jfif, with_exif, format, warnings)
}

/// Keep `fallback` when a metadata step fails in a recoverable way.
fn recover(
    result: Result<Vec<u8>, ConvertError>,
    fallback: Vec<u8>,
    format: OutputFormat,
    warnings: &mut Vec<ConvertWarning>,
) -> Result<Vec<u8>, ConvertError> {
    match result {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.is_recoverable() => {
            log::warn!("{format}: DPI metadata not written: {e}");
            warnings.push(ConvertWarning {
                format,
                message: e.to_string(),
            });
            Ok(fallback)
        }
        Err(e) => Err(e.in_stage(Stage::Metadata, format)),
    }
}
