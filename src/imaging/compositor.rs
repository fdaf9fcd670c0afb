//! Alpha handling for RGBA8 buffers.
//!
//! [`composite`] either passes the RGBA data through untouched or flattens
//! it onto white, producing tightly packed RGB24. [`has_transparency`]
//! decides which of the two a TIFF gets.

use super::backend::PixelBuffer;
use super::params::PixelLayout;
use std::borrow::Cow;

/// Flattened or passthrough pixel data plus its layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composited<'a> {
    pub layout: PixelLayout,
    pub data: Cow<'a, [u8]>,
}

/// True if any pixel has alpha below 255.
pub fn has_transparency(buffer: &PixelBuffer) -> bool {
    buffer.data().chunks_exact(4).any(|px| px[3] < 255)
}

/// Blend one channel over white: `src * a + 255 * (1 - a)`, rounded.
#[inline]
pub fn blend_over_white(src: u8, alpha: u8) -> u8 {
    let a = alpha as f32 / 255.0;
    (src as f32 * a + 255.0 * (1.0 - a)).round().clamp(0.0, 255.0) as u8
}

/// Prepare pixels for an encoder.
///
/// With `preserve_alpha` the RGBA data is borrowed as-is. Otherwise every
/// pixel is blended over white into a new RGB24 buffer; the source buffer
/// is not modified.
pub fn composite(buffer: &PixelBuffer, preserve_alpha: bool) -> Composited<'_> {
    if preserve_alpha {
        return Composited {
            layout: PixelLayout::Rgba8,
            data: Cow::Borrowed(buffer.data()),
        };
    }

    let mut rgb = Vec::with_capacity(buffer.pixel_count() * 3);
    for px in buffer.data().chunks_exact(4) {
        let alpha = px[3];
        if alpha == 255 {
            rgb.extend_from_slice(&px[..3]);
        } else {
            rgb.extend_from_slice(&[
                blend_over_white(px[0], alpha),
                blend_over_white(px[1], alpha),
                blend_over_white(px[2], alpha),
            ]);
        }
    }

    Composited {
        layout: PixelLayout::Rgb8,
        data: Cow::Owned(rgb),
    }
}
