//! # svg-export
//!
//! Rasterize SVG artwork to PNG, JPEG, or TIFF at a chosen print resolution,
//! with DPI metadata that matches the pixel size so the file prints at the
//! intended physical dimensions.
//!
//! # Architecture: One Linear Pipeline
//!
//! ```text
//! validate  markup + options  →  SvgRoot, format, Dpi, Quality
//! resolve   SvgRoot × dpi/72  →  pixel size
//! render    Rasterizer        →  RGBA8 PixelBuffer
//! encode    per format        →  bytes with DPI metadata
//! ```
//!
//! Only the render step is delegated. PNG and JPEG pixels are entropy-coded
//! by a [`BaselineEncoder`](imaging::BaselineEncoder) and then annotated at
//! the byte level; TIFF files are assembled entirely by this crate.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | The codec core: size resolution, compositing, CRC32, PNG/JPEG injectors, IFD builder, TIFF encoder, orchestrator |
//! | [`types`] | Result envelope shared with callers (`OutputFormat`, `EncodedArtifact`, `Conversion`) |
//! | [`batch`] | Converts many files in parallel and reports progress as events |
//! | [`config`] | `svg-export.toml` loading, validation, and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Metadata Is Best-Effort
//!
//! DPI tags improve an image but are not needed to display it. When a baseline
//! stream cannot be annotated, the unannotated image is returned together with
//! a [`ConvertWarning`](types::ConvertWarning). Validation, rendering, and
//! compression failures are errors.
//!
//! ## JPEG Resolution Is Written Twice
//!
//! Some readers honor EXIF `XResolution`, others only the JFIF density. Both
//! are written with the same value.
//!
//! ## Plan, Then Write
//!
//! TIFF and EXIF tag tables go through [`imaging::ifd::IfdBuilder`]: every
//! offset is computed before the first byte is emitted, so StripOffsets is
//! final when the directory is written.
//!
//! ## Pure-Rust Imaging
//!
//! Rendering uses `resvg`, baseline PNG/JPEG encoding the `image` crate, and
//! Deflate `flate2`. No system libraries are needed at runtime.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
