//! Minimal EXIF block for JPEG output.
//!
//! The APP1 payload is `Exif\0\0` followed by a big-endian TIFF structure
//! whose IFD0 holds XResolution, YResolution, ResolutionUnit, Software and
//! DateTime. Offsets inside it are relative to the TIFF header, not to the
//! JPEG stream.

use super::ifd::{IfdBuilder, TagValue, tags};
use super::params::ImageMetadata;
use super::tiff::{FIRST_IFD_OFFSET, header};

/// Identifier that opens an EXIF APP1 payload.
pub const EXIF_IDENTIFIER: &[u8; 6] = b"Exif\0\0";

const RESOLUTION_UNIT_INCH: u16 = 2;

/// Build the APP1 payload (everything after the segment length field).
pub fn exif_payload(meta: &ImageMetadata<'_>) -> Vec<u8> {
    let dpi = meta.dpi.value();
    let mut ifd = IfdBuilder::new();
    ifd.insert(tags::X_RESOLUTION, TagValue::Rational(vec![(dpi, 1)]))
        .insert(tags::Y_RESOLUTION, TagValue::Rational(vec![(dpi, 1)]))
        .insert(
            tags::RESOLUTION_UNIT,
            TagValue::Short(vec![RESOLUTION_UNIT_INCH]),
        )
        .insert(tags::SOFTWARE, TagValue::ascii(meta.software))
        .insert(tags::DATE_TIME, TagValue::ascii(meta.datetime));

    let layout = ifd.plan(FIRST_IFD_OFFSET);
    let mut tiff = Vec::with_capacity(layout.data_end as usize);
    tiff.extend_from_slice(&header());
    layout.write(&mut tiff);

    let mut payload = Vec::with_capacity(EXIF_IDENTIFIER.len() + tiff.len());
    payload.extend_from_slice(EXIF_IDENTIFIER);
    payload.extend_from_slice(&tiff);
    payload
}
