//! Single-strip, Deflate-compressed, big-endian TIFF writer.
//!
//! File layout:
//!
//! ```text
//! 0       "MM" 42 8            header, IFD follows immediately
//! 8       IFD0                 tags in ascending order
//! ifd_end data blocks          out-of-line values, even offsets
//! strip   zlib stream          RGB24 or RGBA32 rows, top to bottom
//! ```
//!
//! The tag table is planned before anything is written, so StripOffsets is
//! known up front and no byte is patched after emission.

use super::backend::PixelBuffer;
use super::compositor::{composite, has_transparency};
use super::error::ConvertError;
use super::ifd::{IfdBuilder, TagValue, tags};
use super::params::ImageMetadata;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;

/// Offset of IFD0: right after the 8-byte header.
pub const FIRST_IFD_OFFSET: u32 = 8;

const COMPRESSION_DEFLATE: u16 = 8;
const PHOTOMETRIC_RGB: u16 = 2;
const RESOLUTION_UNIT_INCH: u16 = 2;
const EXTRA_SAMPLE_ASSOCIATED_ALPHA: u16 = 1;

/// Big-endian TIFF header pointing at IFD0.
pub fn header() -> [u8; 8] {
    let mut h = [0u8; 8];
    h[0..2].copy_from_slice(b"MM");
    h[2..4].copy_from_slice(&42u16.to_be_bytes());
    h[4..8].copy_from_slice(&FIRST_IFD_OFFSET.to_be_bytes());
    h
}

/// Encode `buffer` as a complete TIFF file.
///
/// An alpha channel is written only when `preserve_alpha` is set and the
/// buffer actually has a pixel with alpha below 255; otherwise the pixels
/// are flattened onto white and written as RGB.
pub fn encode_tiff(
    buffer: &PixelBuffer,
    preserve_alpha: bool,
    meta: &ImageMetadata<'_>,
) -> Result<Vec<u8>, ConvertError> {
    let alpha = preserve_alpha && has_transparency(buffer);
    let pixels = composite(buffer, alpha);
    let samples = pixels.layout.channels() as u16;

    let strip = deflate(&pixels.data)?;
    let strip_len = u32::try_from(strip.len()).map_err(|_| {
        ConvertError::CompressionFailed(std::io::Error::other(
            "compressed strip does not fit a 32-bit offset",
        ))
    })?;

    let mut ifd = IfdBuilder::new();
    ifd.insert(tags::IMAGE_WIDTH, TagValue::Long(vec![buffer.width()]))
        .insert(tags::IMAGE_LENGTH, TagValue::Long(vec![buffer.height()]))
        .insert(
            tags::BITS_PER_SAMPLE,
            TagValue::Short(vec![8; samples as usize]),
        )
        .insert(tags::COMPRESSION, TagValue::Short(vec![COMPRESSION_DEFLATE]))
        .insert(
            tags::PHOTOMETRIC_INTERPRETATION,
            TagValue::Short(vec![PHOTOMETRIC_RGB]),
        )
        // Patched once the layout is known
        .insert(tags::STRIP_OFFSETS, TagValue::Long(vec![0]))
        .insert(tags::SAMPLES_PER_PIXEL, TagValue::Short(vec![samples]))
        .insert(tags::ROWS_PER_STRIP, TagValue::Long(vec![buffer.height()]))
        .insert(tags::STRIP_BYTE_COUNTS, TagValue::Long(vec![strip_len]))
        .insert(
            tags::X_RESOLUTION,
            TagValue::Rational(vec![(meta.dpi.value(), 1)]),
        )
        .insert(
            tags::Y_RESOLUTION,
            TagValue::Rational(vec![(meta.dpi.value(), 1)]),
        )
        .insert(
            tags::RESOLUTION_UNIT,
            TagValue::Short(vec![RESOLUTION_UNIT_INCH]),
        )
        .insert(tags::SOFTWARE, TagValue::ascii(meta.software))
        .insert(tags::DATE_TIME, TagValue::ascii(meta.datetime));
    if alpha {
        ifd.insert(
            tags::EXTRA_SAMPLES,
            TagValue::Short(vec![EXTRA_SAMPLE_ASSOCIATED_ALPHA]),
        );
    }

    let mut layout = ifd.plan(FIRST_IFD_OFFSET);
    let strip_offset = layout.data_end;
    layout.set_inline(tags::STRIP_OFFSETS, TagValue::Long(vec![strip_offset]))?;

    let mut out = Vec::with_capacity(strip_offset as usize + strip.len());
    out.extend_from_slice(&header());
    layout.write(&mut out);
    out.extend_from_slice(&strip);

    log::debug!(
        "TIFF {}x{} {} samples, strip {} bytes at {}",
        buffer.width(),
        buffer.height(),
        samples,
        strip_len,
        strip_offset
    );
    Ok(out)
}

/// zlib-wrapped Deflate (TIFF compression 8).
fn deflate(data: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(ConvertError::CompressionFailed)?;
    encoder.finish().map_err(ConvertError::CompressionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Dpi;
    use crate::test_helpers::{buffer_from_pixels, parse_ifd, read_u32_be};
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn meta(dpi: u32) -> ImageMetadata<'static> {
        ImageMetadata {
            dpi: Dpi::new(dpi).unwrap(),
            software: "svg-export test",
            datetime: "2024:05:06 07:08:09",
        }
    }

    fn opaque(w: u32, h: u32) -> PixelBuffer {
        let pixels: Vec<[u8; 4]> = (0..w * h)
            .map(|i| [i as u8, (i * 3) as u8, 200, 255])
            .collect();
        buffer_from_pixels(w, h, &pixels)
    }

    fn with_hole(w: u32, h: u32) -> PixelBuffer {
        let mut pixels = vec![[10u8, 20, 30, 255]; (w * h) as usize];
        pixels[0] = [0, 0, 0, 0];
        buffer_from_pixels(w, h, &pixels)
    }

    fn inflate(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn header_is_big_endian_with_ifd_at_8() {
        let tiff = encode_tiff(&opaque(2, 2), false, &meta(72)).unwrap();
        assert_eq!(&tiff[0..4], &[b'M', b'M', 0, 42]);
        assert_eq!(read_u32_be(&tiff, 4), 8);
    }

    #[test]
    fn opaque_buffer_gives_three_samples() {
        let tiff = encode_tiff(&opaque(3, 2), true, &meta(300)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        assert_eq!(ifd.short(tags::SAMPLES_PER_PIXEL), vec![3]);
        assert_eq!(ifd.short(tags::BITS_PER_SAMPLE), vec![8, 8, 8]);
        assert!(ifd.get(tags::EXTRA_SAMPLES).is_none());
    }

    #[test]
    fn transparent_pixel_gives_four_samples_and_extra_samples() {
        let tiff = encode_tiff(&with_hole(2, 2), true, &meta(300)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        assert_eq!(ifd.short(tags::SAMPLES_PER_PIXEL), vec![4]);
        assert_eq!(ifd.short(tags::BITS_PER_SAMPLE), vec![8, 8, 8, 8]);
        assert_eq!(ifd.short(tags::EXTRA_SAMPLES), vec![1]);
    }

    #[test]
    fn transparency_flattened_when_alpha_not_preserved() {
        let tiff = encode_tiff(&with_hole(2, 1), false, &meta(72)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        assert_eq!(ifd.short(tags::SAMPLES_PER_PIXEL), vec![3]);

        let offset = ifd.long(tags::STRIP_OFFSETS) as usize;
        let pixels = inflate(&tiff[offset..]);
        assert_eq!(pixels, vec![255, 255, 255, 10, 20, 30]);
    }

    #[test]
    fn tags_ascending_and_complete() {
        let tiff = encode_tiff(&opaque(4, 4), false, &meta(150)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        assert_eq!(
            ifd.tags(),
            vec![256, 257, 258, 259, 262, 273, 277, 278, 279, 282, 283, 296, 305, 306]
        );
        assert_eq!(ifd.next_ifd, 0);
        assert_eq!(ifd.long(tags::IMAGE_WIDTH), 4);
        assert_eq!(ifd.long(tags::IMAGE_LENGTH), 4);
        assert_eq!(ifd.long(tags::ROWS_PER_STRIP), 4);
        assert_eq!(ifd.short(tags::COMPRESSION), vec![8]);
        assert_eq!(ifd.short(tags::PHOTOMETRIC_INTERPRETATION), vec![2]);
        assert_eq!(ifd.rational(tags::X_RESOLUTION), (150, 1));
        assert_eq!(ifd.rational(tags::Y_RESOLUTION), (150, 1));
        assert_eq!(ifd.short(tags::RESOLUTION_UNIT), vec![2]);
        assert_eq!(ifd.ascii(tags::SOFTWARE), "svg-export test");
        assert_eq!(ifd.ascii(tags::DATE_TIME), "2024:05:06 07:08:09");
    }

    #[test]
    fn out_of_line_values_sit_between_ifd_and_strip() {
        let tiff = encode_tiff(&with_hole(5, 3), true, &meta(600)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        let ifd_end = 8 + 2 + 12 * ifd.entries.len() as u32 + 4;
        let strip_offset = ifd.long(tags::STRIP_OFFSETS);

        let mut relocated = 0;
        for entry in &ifd.entries {
            if let Some(at) = entry.value_offset {
                relocated += 1;
                assert!(at >= ifd_end, "tag {} at {at} inside IFD", entry.tag);
                assert!(at < strip_offset, "tag {} at {at} past strip", entry.tag);
                assert_eq!(at % 2, 0, "tag {} at odd offset", entry.tag);
            }
        }
        // BitsPerSample, X/YResolution, Software, DateTime
        assert_eq!(relocated, 5);
    }

    #[test]
    fn strip_offset_and_byte_count_are_exact() {
        let buf = opaque(7, 5);
        let tiff = encode_tiff(&buf, false, &meta(96)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        let offset = ifd.long(tags::STRIP_OFFSETS) as usize;
        let count = ifd.long(tags::STRIP_BYTE_COUNTS) as usize;

        assert_eq!(offset % 2, 0);
        assert_eq!(offset + count, tiff.len());

        let pixels = inflate(&tiff[offset..offset + count]);
        let expected: Vec<u8> = buf
            .data()
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect();
        assert_eq!(pixels, expected);
    }

    #[test]
    fn rgba_strip_is_passed_through() {
        let buf = with_hole(3, 3);
        let tiff = encode_tiff(&buf, true, &meta(72)).unwrap();
        let ifd = parse_ifd(&tiff, 8);
        let offset = ifd.long(tags::STRIP_OFFSETS) as usize;
        assert_eq!(inflate(&tiff[offset..]), buf.data());
    }

    #[test]
    fn odd_software_length_keeps_strip_even() {
        // "ab" + NUL is inline; "abcd" + NUL is 5 bytes and needs padding
        for software in ["ab", "abcd", "abcde"] {
            let m = ImageMetadata {
                software,
                ..meta(72)
            };
            let tiff = encode_tiff(&opaque(1, 1), false, &m).unwrap();
            let ifd = parse_ifd(&tiff, 8);
            assert_eq!(ifd.ascii(tags::SOFTWARE), software);
            assert_eq!(ifd.long(tags::STRIP_OFFSETS) % 2, 0, "{software}");
        }
    }
}
