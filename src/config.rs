//! Export configuration module.
//!
//! Handles loading, validating, and merging `svg-export.toml`. Stock defaults
//! are overridden by the user file, and command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "png"            # png, jpeg (jpg), or tiff (tif)
//! dpi = 300                 # 1-2400; 72 renders one SVG unit as one pixel
//! quality = 0.92            # JPEG quality, 0.0-1.0
//! transparent = true        # Keep transparency in PNG and TIFF
//!
//! [metadata]
//! software = "svg-export 0.1.0"  # Written to the EXIF/TIFF Software tag
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [output]
//! format = "tiff"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::operations::MAX_SOFTWARE_LEN;
use crate::imaging::{ConvertOptions, Dpi, Quality, default_software};
use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "svg-export.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Export configuration loaded from `svg-export.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Target format and resolution.
    pub output: OutputConfig,
    /// Descriptive tags written into the files.
    pub metadata: MetadataConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ExportConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Dpi::new(self.output.dpi)
            .map_err(|e| ConfigError::Validation(format!("output.dpi: {e}")))?;
        Quality::new(self.output.quality)
            .map_err(|e| ConfigError::Validation(format!("output.quality: {e}")))?;
        if self.metadata.software.chars().count() > MAX_SOFTWARE_LEN {
            return Err(ConfigError::Validation(format!(
                "metadata.software must be at most {MAX_SOFTWARE_LEN} characters"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Conversion options for one file. `timestamp` is left unset so each
    /// file gets the time it was written.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            format: self.output.format.to_string(),
            dpi: self.output.dpi,
            quality: self.output.quality,
            transparent: self.output.transparent,
            software: self.metadata.software.clone(),
            timestamp: None,
        }
    }
}

/// Target format and resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Dots per inch, 1-2400.
    pub dpi: u32,
    /// JPEG quality, 0.0-1.0. Ignored for PNG and TIFF.
    pub quality: f32,
    /// Keep transparency. JPEG output is always flattened onto white.
    pub transparent: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            dpi: 300,
            quality: Quality::default().value(),
            transparent: true,
        }
    }
}

/// Descriptive tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Value of the EXIF/TIFF `Software` tag.
    pub software: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            software: default_software(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel conversion workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ExportConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`. Tables merge key by key;
/// any other value in `overlay` replaces the one in `base`.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. A missing file is `None`.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto `base`, deserialize, and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ExportConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ExportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ExportConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `svg-export.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# svg-export settings
#
# Save as svg-export.toml in the directory you run svg-export from, or pass
# --config. Every key is optional; the values below are the built-in ones.
# --format, --dpi, --quality, and --opaque on the command line win over
# this file. A misspelled key is reported as an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# File format: "png", "jpeg" (or "jpg"), "tiff" (or "tif").
format = "png"

# Print resolution in dots per inch (1-2400). Pixel size is
# round(declared size * dpi / 72), and the same value is written into the
# file's resolution metadata.
dpi = 300

# JPEG quality from 0.0 (smallest) to 1.0 (best). Ignored for PNG and TIFF.
quality = 0.92

# Keep transparent areas transparent in PNG and TIFF output.
# JPEG has no alpha channel and is always flattened onto white.
transparent = true

# ---------------------------------------------------------------------------
# Metadata
# ---------------------------------------------------------------------------
[metadata]
# Value of the Software tag in EXIF (JPEG) and TIFF output.
# Defaults to "svg-export <version>".
# software = "svg-export"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversion workers. Omit for auto (= number of CPU cores).
# Values larger than the core count are clamped down.
# max_processes = 4
"##
}
