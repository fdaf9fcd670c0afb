//! SVG well-formedness check and root attribute extraction.
//!
//! The whole document is walked once with `quick-xml` so that mismatched or
//! unclosed tags are caught before any rasterization. Only the root
//! element's sizing attributes are kept.

use super::error::ConvertError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Sizing attributes declared on the `<svg>` root, as raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvgRoot {
    pub width: Option<String>,
    pub height: Option<String>,
    pub view_box: Option<String>,
}

/// Parse `markup`, requiring a single well-formed document whose root
/// element is `svg` (any namespace prefix).
pub fn parse_root(markup: &str) -> Result<SvgRoot, ConvertError> {
    let mut reader = Reader::from_str(markup);
    let mut root: Option<SvgRoot> = None;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            ConvertError::InvalidSvg(format!(
                "XML error at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                if depth == 0 {
                    root = Some(open_root(&e, root.is_some())?);
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    root = Some(open_root(&e, root.is_some())?);
                }
            }
            Event::End(_) => {
                // quick-xml rejects unmatched end tags itself
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(ConvertError::InvalidSvg(
            "document ends before the root element is closed".into(),
        ));
    }
    root.ok_or_else(|| ConvertError::InvalidSvg("document has no root element".into()))
}

fn open_root(element: &BytesStart<'_>, seen_root: bool) -> Result<SvgRoot, ConvertError> {
    if seen_root {
        return Err(ConvertError::InvalidSvg(
            "document has more than one root element".into(),
        ));
    }
    let local = element.local_name();
    if local.as_ref() != b"svg" {
        return Err(ConvertError::InvalidSvg(format!(
            "root element is <{}>, expected <svg>",
            String::from_utf8_lossy(local.as_ref())
        )));
    }

    let mut root = SvgRoot::default();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ConvertError::InvalidSvg(format!("bad attribute: {e}")))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|_| ConvertError::InvalidSvg("attribute is not UTF-8".into()))?
            .trim()
            .to_string();
        match attr.key.local_name().as_ref() {
            b"width" => root.width = Some(value),
            b"height" => root.height = Some(value),
            b"viewBox" => root.view_box = Some(value),
            _ => {}
        }
    }
    Ok(root)
}
