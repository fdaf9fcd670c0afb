//! JPEG resolution metadata.
//!
//! Resolution is written twice, because readers disagree on which one they
//! honor:
//!
//! - [`insert_exif`] adds an `Exif` APP1 segment (see [`exif`](super::exif)).
//! - [`patch_jfif_density`] sets the density fields of the JFIF APP0 segment,
//!   building that segment when the stream has none.
//!
//! Only the run of APPn segments right after SOI is examined. Everything
//! from the first non-APPn marker on is copied through untouched.

use super::error::ConvertError;
use super::exif::EXIF_IDENTIFIER;
use super::params::Dpi;
use std::ops::Range;

pub const SOI: [u8; 2] = [0xFF, 0xD8];

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

const JFIF_IDENTIFIER: &[u8; 5] = b"JFIF\0";

/// JFIF density unit: dots per inch.
const UNIT_DPI: u8 = 1;

/// Size of the APP0 segment built when none exists.
pub const JFIF_SEGMENT_LEN: usize = 18;

/// One APPn segment: marker byte and the byte range it occupies, from its
/// 0xFF through the end of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AppSegment {
    marker: u8,
    range: Range<usize>,
}

impl AppSegment {
    fn payload<'a>(&self, jpeg: &'a [u8]) -> &'a [u8] {
        &jpeg[self.range.start + 4..self.range.end]
    }
}

fn check_soi(jpeg: &[u8]) -> Result<(), ConvertError> {
    if jpeg.len() < 2 || jpeg[..2] != SOI {
        return Err(ConvertError::InvalidJpegHeader);
    }
    Ok(())
}

/// APPn segments directly following SOI. Stops at the first other marker,
/// at a length field that is invalid, or at the end of the buffer.
fn app_segments(jpeg: &[u8]) -> Vec<AppSegment> {
    let mut segments = Vec::new();
    let mut i = 2;
    while i + 4 <= jpeg.len() && jpeg[i] == 0xFF && (0xE0..=0xEF).contains(&jpeg[i + 1]) {
        let len = u16::from_be_bytes([jpeg[i + 2], jpeg[i + 3]]) as usize;
        let end = i + 2 + len;
        if len < 2 || end > jpeg.len() {
            break;
        }
        segments.push(AppSegment {
            marker: jpeg[i + 1],
            range: i..end,
        });
        i = end;
    }
    segments
}

/// Wrap `payload` as a marker segment with its length field.
fn segment(marker: u8, payload: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let len = u16::try_from(payload.len() + 2)
        .map_err(|_| ConvertError::MetadataTooLarge(payload.len()))?;
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Insert an `Exif` APP1 segment holding `exif_payload`.
///
/// The segment goes after a leading JFIF APP0 segment when there is one,
/// otherwise directly after SOI. Existing `Exif` APP1 segments are dropped.
pub fn insert_exif(jpeg: &[u8], exif_payload: &[u8]) -> Result<Vec<u8>, ConvertError> {
    check_soi(jpeg)?;
    let app1 = segment(APP1, exif_payload)?;

    let segments = app_segments(jpeg);
    let scan_end = segments.last().map_or(2, |s| s.range.end);
    let after_jfif = segments
        .first()
        .is_some_and(|s| s.marker == APP0 && s.payload(jpeg).starts_with(JFIF_IDENTIFIER));

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&SOI);
    if !after_jfif {
        out.extend_from_slice(&app1);
    }
    for (idx, seg) in segments.iter().enumerate() {
        let is_exif = seg.marker == APP1 && seg.payload(jpeg).starts_with(EXIF_IDENTIFIER);
        if !is_exif {
            out.extend_from_slice(&jpeg[seg.range.clone()]);
        }
        if idx == 0 && after_jfif {
            out.extend_from_slice(&app1);
        }
    }
    out.extend_from_slice(&jpeg[scan_end..]);
    Ok(out)
}

/// Complete JFIF 1.1 APP0 segment with density in DPI and no thumbnail.
pub fn jfif_segment(dpi: Dpi) -> [u8; JFIF_SEGMENT_LEN] {
    let d = (dpi.value() as u16).to_be_bytes();
    let mut seg = [0u8; JFIF_SEGMENT_LEN];
    seg[0..2].copy_from_slice(&[0xFF, APP0]);
    seg[2..4].copy_from_slice(&16u16.to_be_bytes());
    seg[4..9].copy_from_slice(JFIF_IDENTIFIER);
    seg[9..11].copy_from_slice(&[1, 1]);
    seg[11] = UNIT_DPI;
    seg[12..14].copy_from_slice(&d);
    seg[14..16].copy_from_slice(&d);
    // Thumbnail width and height stay 0
    seg
}

/// Set the JFIF density to `dpi` on both axes.
///
/// The first APPn segment carrying the `JFIF\0` identifier is patched in
/// place (unit at +11, X at +12, Y at +14 from its marker). If none is
/// found, a new APP0 segment is spliced in right after SOI.
pub fn patch_jfif_density(jpeg: &[u8], dpi: Dpi) -> Result<Vec<u8>, ConvertError> {
    check_soi(jpeg)?;
    let d = (dpi.value() as u16).to_be_bytes();

    let jfif = app_segments(jpeg)
        .into_iter()
        .find(|s| s.range.len() >= 16 && s.payload(jpeg).starts_with(JFIF_IDENTIFIER));

    match jfif {
        Some(seg) => {
            let i = seg.range.start;
            let mut out = jpeg.to_vec();
            out[i + 11] = UNIT_DPI;
            out[i + 12..i + 14].copy_from_slice(&d);
            out[i + 14..i + 16].copy_from_slice(&d);
            Ok(out)
        }
        None => {
            log::debug!("no JFIF segment found, inserting one");
            let mut out = Vec::with_capacity(jpeg.len() + JFIF_SEGMENT_LEN);
            out.extend_from_slice(&SOI);
            out.extend_from_slice(&jfif_segment(dpi));
            out.extend_from_slice(&jpeg[2..]);
            Ok(out)
        }
    }
}
