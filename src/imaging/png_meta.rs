//! PNG resolution metadata (`pHYs` chunk).
//!
//! A conforming encoder always writes the 8-byte signature followed by the
//! 25-byte IHDR chunk, so the `pHYs` chunk can be spliced in at a fixed
//! offset. The layout is validated, not re-parsed:
//!
//! ```text
//! 0..8    signature
//! 8..12   IHDR length (13)
//! 12..16  "IHDR"
//! 16..29  IHDR payload
//! 29..33  IHDR CRC
//! 33..    pHYs goes here, rest of the stream follows untouched
//! ```

use super::calculations::pixels_per_meter;
use super::crc32::Crc32;
use super::error::ConvertError;
use super::params::Dpi;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Byte offset just past the IHDR chunk.
const IHDR_END: usize = 8 + 4 + 4 + 13 + 4;

/// `pHYs` unit specifier: pixels per meter.
const UNIT_METER: u8 = 1;

/// Total size of the chunk this module inserts.
pub const PHYS_CHUNK_LEN: usize = 4 + 4 + 9 + 4;

/// Build a complete `pHYs` chunk (length, type, payload, CRC) for `dpi`.
pub fn phys_chunk(dpi: Dpi) -> [u8; PHYS_CHUNK_LEN] {
    let ppm = pixels_per_meter(dpi).to_be_bytes();

    let mut chunk = [0u8; PHYS_CHUNK_LEN];
    chunk[0..4].copy_from_slice(&9u32.to_be_bytes());
    chunk[4..8].copy_from_slice(b"pHYs");
    chunk[8..12].copy_from_slice(&ppm);
    chunk[12..16].copy_from_slice(&ppm);
    chunk[16] = UNIT_METER;

    let mut crc = Crc32::new();
    crc.update(&chunk[4..17]);
    chunk[17..21].copy_from_slice(&crc.finalize().to_be_bytes());
    chunk
}

/// Insert a `pHYs` chunk right after IHDR.
///
/// Fails with [`ConvertError::MalformedPng`] if the stream does not start
/// with the PNG signature and an IHDR chunk.
pub fn inject_dpi(png: &[u8], dpi: Dpi) -> Result<Vec<u8>, ConvertError> {
    if png.len() < IHDR_END {
        return Err(ConvertError::MalformedPng(format!(
            "stream is {} bytes, shorter than signature + IHDR",
            png.len()
        )));
    }
    if png[0..8] != PNG_SIGNATURE {
        return Err(ConvertError::MalformedPng("missing PNG signature".into()));
    }
    if &png[12..16] != b"IHDR" {
        return Err(ConvertError::MalformedPng(
            "first chunk is not IHDR".into(),
        ));
    }

    let mut out = Vec::with_capacity(png.len() + PHYS_CHUNK_LEN);
    out.extend_from_slice(&png[..IHDR_END]);
    out.extend_from_slice(&phys_chunk(dpi));
    out.extend_from_slice(&png[IHDR_END..]);
    Ok(out)
}
