//! Raster codec and DPI metadata injection in pure Rust.
//!
//! | Operation | Module |
//! |---|---|
//! | **Validate SVG** | [`svg`]: quick-xml walk, root must be `<svg>` |
//! | **Resolve size** | `calculations`: width/height → viewBox → natural, × dpi/72 |
//! | **Rasterize** | [`ResvgRasterizer`] behind the [`Rasterizer`] trait |
//! | **Composite** | [`compositor`]: RGBA passthrough or RGB over white |
//! | **PNG** | baseline encoder + `pHYs` after IHDR ([`png_meta`]) |
//! | **JPEG** | baseline encoder + EXIF APP1 + JFIF density ([`jpeg_meta`]) |
//! | **TIFF** | hand-built IFD ([`ifd`]) + zlib strip ([`tiff`]) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for size and resolution math (unit testable)
//! - **Parameters**: Validated request values ([`Dpi`], [`Quality`])
//! - **Backend**: [`Rasterizer`] / [`BaselineEncoder`] traits + their resvg and image-crate implementations
//! - **Injectors and encoders**: Byte-level PNG, JPEG, and TIFF construction
//! - **Operations**: [`convert_with_backend`], tying the above together

pub mod backend;
mod calculations;
pub mod compositor;
pub mod crc32;
mod error;
pub mod exif;
pub mod ifd;
pub mod jpeg_meta;
pub mod operations;
mod params;
pub mod png_meta;
pub mod rust_backend;
pub mod svg;
pub mod tiff;

pub use backend::{BackendError, BaselineEncoder, Dimensions, PixelBuffer, Rasterizer};
pub use calculations::{
    declared_size, exif_datetime, parse_length, parse_view_box, pixels_per_meter,
    resolve_pixel_size, scale_to_pixels,
};
pub use error::{ConvertError, Stage};
pub use operations::{
    ConvertOptions, ValidatedRequest, convert, convert_with_backend, default_software, validate,
};
pub use params::{BASELINE_DPI, Dpi, ImageMetadata, MAX_DPI, PixelLayout, Quality};
pub use rust_backend::{ImageCrateEncoder, ResvgRasterizer};
