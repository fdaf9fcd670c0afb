//! Shared test utilities for the svg-export test suite.
//!
//! Byte-level readers for the container formats this crate writes, so tests
//! can assert on chunk order, segment layout, and tag values without going
//! through a full decoder.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let chunks = png_chunks(&png);
//! assert_eq!(chunks[1].name, *b"pHYs");
//! assert!(chunks.iter().all(|c| c.crc_valid));
//!
//! let ifd = parse_ifd(&tiff, 8);
//! assert_eq!(ifd.short(258), vec![8, 8, 8]);
//! ```

use crate::imaging::backend::PixelBuffer;
use crate::imaging::crc32::crc32;

// =========================================================================
// Integers
// =========================================================================

pub fn read_u16_be(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

pub fn read_u32_be(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

// =========================================================================
// Pixels
// =========================================================================

/// Build a buffer from per-pixel RGBA values. Panics on a size mismatch.
pub fn buffer_from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> PixelBuffer {
    let data: Vec<u8> = pixels.iter().flatten().copied().collect();
    PixelBuffer::new(width, height, data).unwrap()
}

// =========================================================================
// PNG
// =========================================================================

/// Build one PNG chunk with a correct CRC.
pub fn png_chunk(name: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + data.len());
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    let mut typed = name.to_vec();
    typed.extend_from_slice(data);
    out.extend_from_slice(&crc32(&typed).to_be_bytes());
    out
}

#[derive(Debug, Clone)]
pub struct PngChunk {
    pub name: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
    /// Stored CRC matches the one recomputed over type + data.
    pub crc_valid: bool,
}

/// Split a PNG stream (signature included) into chunks. Panics if the
/// stream is truncated mid-chunk.
pub fn png_chunks(png: &[u8]) -> Vec<PngChunk> {
    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos + 12 <= png.len() {
        let len = read_u32_be(png, pos) as usize;
        let name: [u8; 4] = png[pos + 4..pos + 8].try_into().unwrap();
        let data = png[pos + 8..pos + 8 + len].to_vec();
        let crc = read_u32_be(png, pos + 8 + len);
        let crc_valid = crc == crc32(&png[pos + 4..pos + 8 + len]);
        chunks.push(PngChunk {
            name,
            data,
            crc,
            crc_valid,
        });
        pos += 12 + len;
    }
    assert_eq!(pos, png.len(), "trailing bytes after last PNG chunk");
    chunks
}

// =========================================================================
// JPEG
// =========================================================================

#[derive(Debug, Clone)]
pub struct JpegSegment {
    /// Marker byte after 0xFF (0xE0 for APP0, 0xE1 for APP1, ...).
    pub marker: u8,
    /// Offset of the 0xFF that starts the segment.
    pub offset: usize,
    /// Bytes after the 2-byte length field.
    pub payload: Vec<u8>,
}

/// Walk the marker segments after SOI, stopping at SOS or EOI (neither is
/// included). Panics if the stream does not start with SOI.
pub fn jpeg_segments(jpeg: &[u8]) -> Vec<JpegSegment> {
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "missing SOI");
    let mut segments = Vec::new();
    let mut pos = 2;
    while pos + 4 <= jpeg.len() && jpeg[pos] == 0xFF {
        let marker = jpeg[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let len = read_u16_be(jpeg, pos + 2) as usize;
        segments.push(JpegSegment {
            marker,
            offset: pos,
            payload: jpeg[pos + 4..pos + 2 + len].to_vec(),
        });
        pos += 2 + len;
    }
    segments
}

// =========================================================================
// TIFF IFD
// =========================================================================

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    /// Value bytes, resolved from the inline field or the data area.
    pub data: Vec<u8>,
    /// Where the value lives: `None` when inline.
    pub value_offset: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ParsedIfd {
    pub entries: Vec<ParsedEntry>,
    pub next_ifd: u32,
}

impl ParsedIfd {
    pub fn get(&self, tag: u16) -> Option<&ParsedEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn tags(&self) -> Vec<u16> {
        self.entries.iter().map(|e| e.tag).collect()
    }

    /// SHORT values of `tag`. Panics if absent.
    pub fn short(&self, tag: u16) -> Vec<u16> {
        let e = self.get(tag).unwrap_or_else(|| panic!("tag {tag} missing"));
        assert_eq!(e.field_type, 3, "tag {tag} is not SHORT");
        e.data.chunks_exact(2).map(|c| read_u16_be(c, 0)).collect()
    }

    /// First LONG value of `tag`. Panics if absent.
    pub fn long(&self, tag: u16) -> u32 {
        let e = self.get(tag).unwrap_or_else(|| panic!("tag {tag} missing"));
        assert_eq!(e.field_type, 4, "tag {tag} is not LONG");
        read_u32_be(&e.data, 0)
    }

    /// First RATIONAL value of `tag`. Panics if absent.
    pub fn rational(&self, tag: u16) -> (u32, u32) {
        let e = self.get(tag).unwrap_or_else(|| panic!("tag {tag} missing"));
        assert_eq!(e.field_type, 5, "tag {tag} is not RATIONAL");
        (read_u32_be(&e.data, 0), read_u32_be(&e.data, 4))
    }

    /// ASCII value of `tag` without its terminator. Panics if absent.
    pub fn ascii(&self, tag: u16) -> String {
        let e = self.get(tag).unwrap_or_else(|| panic!("tag {tag} missing"));
        assert_eq!(e.field_type, 2, "tag {tag} is not ASCII");
        assert_eq!(e.data.last(), Some(&0), "tag {tag} not NUL-terminated");
        String::from_utf8(e.data[..e.data.len() - 1].to_vec()).unwrap()
    }
}

/// Parse a big-endian IFD at `offset`. `tiff` must start at the TIFF header.
pub fn parse_ifd(tiff: &[u8], offset: usize) -> ParsedIfd {
    let count = read_u16_be(tiff, offset) as usize;
    let entries = (0..count)
        .map(|i| {
            let at = offset + 2 + i * 12;
            let tag = read_u16_be(tiff, at);
            let field_type = read_u16_be(tiff, at + 2);
            let count = read_u32_be(tiff, at + 4);
            let size = match field_type {
                2 => 1,
                3 => 2,
                4 => 4,
                5 => 8,
                other => panic!("unexpected field type {other} for tag {tag}"),
            } * count as usize;
            if size <= 4 {
                ParsedEntry {
                    tag,
                    field_type,
                    count,
                    data: tiff[at + 8..at + 8 + size].to_vec(),
                    value_offset: None,
                }
            } else {
                let value_at = read_u32_be(tiff, at + 8);
                let start = value_at as usize;
                ParsedEntry {
                    tag,
                    field_type,
                    count,
                    data: tiff[start..start + size].to_vec(),
                    value_offset: Some(value_at),
                }
            }
        })
        .collect();
    ParsedIfd {
        entries,
        next_ifd: read_u32_be(tiff, offset + 2 + count * 12),
    }
}
