//! Shared types returned to callers of the conversion pipeline.
//!
//! An [`EncodedArtifact`] is created once per conversion and never mutated:
//! its bytes and MIME type are only reachable through accessors.

use crate::imaging::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target file format.
///
/// Parses from the identifiers callers pass in (`png`, `jpg`/`jpeg`,
/// `tiff`/`tif`, case-insensitive). Serialized in config files as
/// `"png"`, `"jpeg"`, or `"tiff"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    #[serde(alias = "tif")]
    Tiff,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Tiff => "image/tiff",
        }
    }

    /// File extension used for output names.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Whether the format can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl FromStr for OutputFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            _ => Err(ConvertError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Tiff => "tiff",
        })
    }
}

/// Encoded file bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    data: Vec<u8>,
    mime_type: &'static str,
}

impl EncodedArtifact {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            data,
            mime_type: format.mime_type(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// A non-fatal problem hit while annotating an image with DPI metadata.
///
/// The image is still usable; it just lacks (some of) the resolution tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertWarning {
    pub format: OutputFormat,
    pub message: String,
}

impl fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.format, self.message)
    }
}

/// Result envelope of one conversion call.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub artifact: EncodedArtifact,
    /// Pixel size the SVG was rasterized at.
    pub width: u32,
    pub height: u32,
    pub warnings: Vec<ConvertWarning>,
}
