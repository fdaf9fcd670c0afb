//! Pure calculation functions for sizes, resolutions, and timestamps.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use super::error::ConvertError;
use super::params::{BASELINE_DPI, Dpi};
use super::svg::SvgRoot;

/// Inches per meter, as used for PNG `pHYs` conversion.
pub const INCHES_PER_METER: f64 = 39.3701;

/// Parse a length attribute such as `"100"`, `"12.5px"`, or `"3e1"`.
///
/// Takes the leading decimal number and ignores any unit suffix.
/// Percentages and values with no leading number yield `None`.
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.ends_with('%') {
        return None;
    }
    let end = numeric_prefix_len(value);
    if end == 0 {
        return None;
    }
    value[..end].parse::<f64>().ok()
}

/// Length of the longest prefix that looks like a decimal number
/// (sign, digits, fraction, exponent).
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == digits_start || (i == digits_start + 1 && bytes[digits_start] == b'.') {
        return 0;
    }
    // Exponent only counts if digits follow it
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_digits = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits {
            i = j;
        }
    }
    i
}

/// Width and height from a `viewBox` value: its third and fourth numbers.
///
/// Numbers may be separated by whitespace, commas, or both.
pub fn parse_view_box(value: &str) -> Option<(f64, f64)> {
    let numbers: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .ok()?;
    if numbers.len() < 4 {
        return None;
    }
    Some((numbers[2], numbers[3]))
}

/// Declared size in SVG user units.
///
/// Precedence: `width` + `height` attributes, then `viewBox`, then the
/// natural size reported by the rasterizer.
pub fn declared_size(
    root: &SvgRoot,
    natural: Option<(f64, f64)>,
) -> Result<(f64, f64), ConvertError> {
    let explicit = match (&root.width, &root.height) {
        (Some(w), Some(h)) => parse_length(w).zip(parse_length(h)),
        _ => None,
    };
    explicit
        .or_else(|| root.view_box.as_deref().and_then(parse_view_box))
        .or(natural)
        .ok_or(ConvertError::DimensionUnavailable)
}

/// Scale a declared size to pixels: `round(declared * dpi / 72)` per axis.
///
/// Both axes must come out finite and at least 1px.
pub fn scale_to_pixels(declared: (f64, f64), dpi: Dpi) -> Result<Dimensions, ConvertError> {
    let (w, h) = declared;
    let dpi = dpi.value() as f64;
    let px_w = (w * dpi / BASELINE_DPI as f64).round();
    let px_h = (h * dpi / BASELINE_DPI as f64).round();

    let valid = |v: f64| v.is_finite() && v >= 1.0 && v <= u32::MAX as f64;
    if !valid(px_w) || !valid(px_h) {
        return Err(ConvertError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    Ok(Dimensions {
        width: px_w as u32,
        height: px_h as u32,
    })
}

/// Resolve the raster size for `root` at `dpi`.
pub fn resolve_pixel_size(
    root: &SvgRoot,
    natural: Option<(f64, f64)>,
    dpi: Dpi,
) -> Result<Dimensions, ConvertError> {
    scale_to_pixels(declared_size(root, natural)?, dpi)
}

/// DPI converted to pixels per meter, rounded.
pub fn pixels_per_meter(dpi: Dpi) -> u32 {
    (dpi.value() as f64 * INCHES_PER_METER).round() as u32
}

/// Format seconds since the Unix epoch as an EXIF/TIFF `DateTime`
/// (`YYYY:MM:DD HH:MM:SS`, UTC).
pub fn exif_datetime(unix_secs: u64) -> String {
    let days = (unix_secs / 86_400) as i64;
    let secs_of_day = unix_secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}:{:02}:{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        secs_of_day / 3600,
        (secs_of_day / 60) % 60,
        secs_of_day % 60
    )
}

/// Current time as an EXIF `DateTime`.
pub fn exif_datetime_now() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    exif_datetime(secs)
}

/// Proleptic Gregorian date for a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}
