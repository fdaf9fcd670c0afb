//! Big-endian TIFF Image File Directory builder.
//!
//! Writing happens in two passes so no byte is ever patched after it has
//! been emitted:
//!
//! 1. [`IfdBuilder::plan`] encodes every value, decides whether it fits in
//!    the 4-byte value field of its 12-byte entry, and assigns each
//!    out-of-line value an even offset in the data area that follows the
//!    directory. The result is an [`IfdLayout`].
//! 2. [`IfdLayout::write`] emits the directory and data area in one go.
//!
//! Between the two, inline values whose final content depends on the layout
//! (StripOffsets) are filled in with [`IfdLayout::set_inline`].
//!
//! ```text
//! ifd_offset:  count (2)
//!              entry × count (12 each: tag, type, count, value/offset)
//!              next IFD offset (4, always 0)
//! ifd_end:     data blocks, each starting on an even offset
//! data_end:    first free (even) offset after the last block
//! ```
//!
//! All offsets are relative to the start of the TIFF header, which is the
//! file start for TIFF and the byte after `Exif\0\0` for EXIF.

use std::collections::BTreeMap;

/// Tag codes used by this crate.
pub mod tags {
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    pub const STRIP_OFFSETS: u16 = 273;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const ROWS_PER_STRIP: u16 = 278;
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    pub const X_RESOLUTION: u16 = 282;
    pub const Y_RESOLUTION: u16 = 283;
    pub const RESOLUTION_UNIT: u16 = 296;
    pub const SOFTWARE: u16 = 305;
    pub const DATE_TIME: u16 = 306;
    pub const EXTRA_SAMPLES: u16 = 338;
}

/// Size of the IFD entry value field.
const INLINE_CAPACITY: usize = 4;
const ENTRY_LEN: usize = 12;

/// TIFF field types this builder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Ascii,
    Short,
    Long,
    Rational,
}

impl FieldType {
    /// Type code as written in the entry.
    pub fn code(self) -> u16 {
        match self {
            FieldType::Ascii => 2,
            FieldType::Short => 3,
            FieldType::Long => 4,
            FieldType::Rational => 5,
        }
    }

    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            FieldType::Ascii => 1,
            FieldType::Short => 2,
            FieldType::Long => 4,
            FieldType::Rational => 8,
        }
    }
}

/// A tag value. ASCII strings are stored without their terminator; the NUL
/// is added (and counted) on encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    /// Numerator / denominator pairs.
    Rational(Vec<(u32, u32)>),
}

impl TagValue {
    /// ASCII value from arbitrary text. Bytes outside 7-bit ASCII and
    /// embedded NULs become `?`.
    pub fn ascii(text: &str) -> Self {
        TagValue::Ascii(
            text.chars()
                .map(|c| if c.is_ascii() && c != '\0' { c } else { '?' })
                .collect(),
        )
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            TagValue::Ascii(_) => FieldType::Ascii,
            TagValue::Short(_) => FieldType::Short,
            TagValue::Long(_) => FieldType::Long,
            TagValue::Rational(_) => FieldType::Rational,
        }
    }

    /// Element count as written in the entry.
    pub fn count(&self) -> u32 {
        match self {
            TagValue::Ascii(s) => s.len() as u32 + 1,
            TagValue::Short(v) => v.len() as u32,
            TagValue::Long(v) => v.len() as u32,
            TagValue::Rational(v) => v.len() as u32,
        }
    }

    /// Encoded length: `type size × count`.
    pub fn byte_len(&self) -> usize {
        self.field_type().size() * self.count() as usize
    }

    /// Big-endian encoding of the value.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        match self {
            TagValue::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
            TagValue::Short(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            TagValue::Long(v) => v.iter().for_each(|x| out.extend_from_slice(&x.to_be_bytes())),
            TagValue::Rational(v) => v.iter().for_each(|(n, d)| {
                out.extend_from_slice(&n.to_be_bytes());
                out.extend_from_slice(&d.to_be_bytes());
            }),
        }
        out
    }
}

/// One tag-table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffTagEntry {
    pub tag: u16,
    pub value: TagValue,
}

/// Collects tags for one IFD. Tags are keyed by code, so the directory is
/// always written in ascending order and inserting a tag twice keeps the
/// last value.
#[derive(Debug, Clone, Default)]
pub struct IfdBuilder {
    entries: BTreeMap<u16, TagValue>,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: u16, value: TagValue) -> &mut Self {
        self.entries.insert(tag, value);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they will be written.
    pub fn entries(&self) -> impl Iterator<Item = TiffTagEntry> + '_ {
        self.entries.iter().map(|(&tag, value)| TiffTagEntry {
            tag,
            value: value.clone(),
        })
    }

    /// Compute the layout of this IFD placed at `ifd_offset`.
    pub fn plan(&self, ifd_offset: u32) -> IfdLayout {
        let ifd_len = 2 + ENTRY_LEN * self.entries.len() + 4;
        let ifd_end = ifd_offset as usize + ifd_len;
        let mut cursor = ifd_end;

        let entries = self
            .entries
            .iter()
            .map(|(&tag, value)| {
                let payload = value.encode();
                let placement = if payload.len() <= INLINE_CAPACITY {
                    Placement::Inline
                } else {
                    cursor = align_even(cursor);
                    let at = cursor as u32;
                    cursor += payload.len();
                    Placement::OutOfLine(at)
                };
                PlannedEntry {
                    tag,
                    field_type: value.field_type(),
                    count: value.count(),
                    payload,
                    placement,
                }
            })
            .collect();

        IfdLayout {
            ifd_offset,
            ifd_end: ifd_end as u32,
            data_end: align_even(cursor) as u32,
            entries,
        }
    }
}

fn align_even(offset: usize) -> usize {
    offset + (offset & 1)
}

/// Where an entry's value ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Stored left-justified in the entry's 4-byte value field.
    Inline,
    /// Stored in the data area at this offset.
    OutOfLine(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u32,
    pub payload: Vec<u8>,
    pub placement: Placement,
}

/// Error from [`IfdLayout::set_inline`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("tag {0} is not in the directory")]
    MissingTag(u16),
    #[error("tag {0} cannot change size or placement after planning")]
    NotInline(u16),
}

/// Fully planned IFD: every offset is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdLayout {
    pub ifd_offset: u32,
    /// First byte after the directory (start of the data area).
    pub ifd_end: u32,
    /// First even offset after the data area.
    pub data_end: u32,
    pub entries: Vec<PlannedEntry>,
}

impl IfdLayout {
    /// Replace an inline value. The new value must have the same type and
    /// count, so nothing else in the layout moves.
    pub fn set_inline(&mut self, tag: u16, value: TagValue) -> Result<(), LayoutError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.tag == tag)
            .ok_or(LayoutError::MissingTag(tag))?;
        if entry.placement != Placement::Inline
            || entry.field_type != value.field_type()
            || entry.count != value.count()
        {
            return Err(LayoutError::NotInline(tag));
        }
        entry.payload = value.encode();
        Ok(())
    }

    pub fn entry(&self, tag: u16) -> Option<&PlannedEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Emit the directory and its data area.
    ///
    /// `out` must already be exactly `ifd_offset` bytes long (relative to
    /// the TIFF header start). On return it is `data_end` bytes long.
    pub fn write(&self, out: &mut Vec<u8>) {
        debug_assert_eq!(out.len(), self.ifd_offset as usize);

        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.tag.to_be_bytes());
            out.extend_from_slice(&entry.field_type.code().to_be_bytes());
            out.extend_from_slice(&entry.count.to_be_bytes());
            match entry.placement {
                Placement::Inline => {
                    let mut field = [0u8; INLINE_CAPACITY];
                    field[..entry.payload.len()].copy_from_slice(&entry.payload);
                    out.extend_from_slice(&field);
                }
                Placement::OutOfLine(at) => out.extend_from_slice(&at.to_be_bytes()),
            }
        }
        // No further IFDs
        out.extend_from_slice(&0u32.to_be_bytes());

        for entry in &self.entries {
            if let Placement::OutOfLine(at) = entry.placement {
                out.resize(at as usize, 0);
                out.extend_from_slice(&entry.payload);
            }
        }
        out.resize(self.data_end as usize, 0);
    }
}
