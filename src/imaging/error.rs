//! Conversion error taxonomy.
//!
//! Input-validation errors are fatal and surface before any pixel work.
//! The metadata injectors raise [`ConvertError::MalformedPng`],
//! [`ConvertError::InvalidJpegHeader`] and
//! [`ConvertError::MetadataTooLarge`], but the orchestrator downgrades them to
//! [`ConvertWarning`](crate::types::ConvertWarning)s and keeps the
//! unannotated image. Everything raised after validation is wrapped in
//! [`ConvertError::Stage`] so the message names the stage and format.

use super::backend::BackendError;
use super::ifd::LayoutError;
use crate::types::OutputFormat;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Invalid SVG: {0}")]
    InvalidSvg(String),
    #[error("Unsupported format: {0:?} (expected png, jpg/jpeg, or tiff/tif)")]
    UnsupportedFormat(String),
    #[error("Invalid DPI {0}: must be between 1 and 2400")]
    InvalidDpi(u32),
    #[error("Invalid quality {0}: must be between 0.0 and 1.0")]
    InvalidQuality(f32),
    #[error("SVG declares no width/height or viewBox, and no natural size is available")]
    DimensionUnavailable,
    #[error("Invalid dimensions {width}x{height}: both must resolve to at least 1px")]
    InvalidDimensions { width: f64, height: f64 },
    #[error("Malformed PNG: {0}")]
    MalformedPng(String),
    #[error("Invalid JPEG header: missing SOI marker")]
    InvalidJpegHeader,
    #[error("Metadata segment of {0} bytes exceeds the 65533-byte JPEG limit")]
    MetadataTooLarge(usize),
    #[error("Rasterization failed: {0}")]
    RasterizationFailed(#[source] BackendError),
    #[error("Baseline {format} encoder failed: {source}")]
    EncodeFailed {
        format: OutputFormat,
        #[source]
        source: BackendError,
    },
    #[error("Deflate compression failed: {0}")]
    CompressionFailed(#[source] std::io::Error),
    #[error("Tag table layout failed: {0}")]
    Layout(#[from] LayoutError),
    #[error("{stage} stage failed for {format}: {source}")]
    Stage {
        stage: Stage,
        format: OutputFormat,
        #[source]
        source: Box<ConvertError>,
    },
}

impl ConvertError {
    /// Wrap with the stage and format the error came from.
    pub fn in_stage(self, stage: Stage, format: OutputFormat) -> Self {
        ConvertError::Stage {
            stage,
            format,
            source: Box::new(self),
        }
    }

    /// The underlying error with any [`ConvertError::Stage`] context removed.
    pub fn root(&self) -> &ConvertError {
        match self {
            ConvertError::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the conversion can still produce output despite this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.root(),
            ConvertError::MalformedPng(_)
                | ConvertError::InvalidJpegHeader
                | ConvertError::MetadataTooLarge(_)
        )
    }
}

/// Pipeline stage named in [`ConvertError::Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    Encode,
    Metadata,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Rasterize => "rasterize",
            Stage::Encode => "encode",
            Stage::Metadata => "metadata",
        })
    }
}
