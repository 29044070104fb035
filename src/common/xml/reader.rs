//! Small building blocks for quick-xml event loops.
//!
//! Every part decoder in the crate walks a `Reader<&[u8]>` by hand. These
//! helpers cover the repeated bits: attribute lookup, entity-aware text
//! accumulation, capturing the source bytes of elements the model does not
//! cover, and tracking where in the element tree the loop currently is.

use quick_xml::Reader;
use quick_xml::encoding::EncodingError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, BytesText};

type XmlResult<T> = std::result::Result<T, quick_xml::Error>;

/// Create a reader over raw part bytes.
///
/// Text is not trimmed: run text such as `<a:t> x </a:t>` is significant.
#[inline]
pub fn xml_reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    reader
}

/// Look up an unprefixed attribute by exact key (e.g. `b"name"`) and unescape it.
pub fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> XmlResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Look up a namespace-prefixed attribute by local name, whatever the prefix.
///
/// Used for `r:id` / `r:embed`, which share their local name with unprefixed
/// attributes on the same element.
pub fn attr_prefixed(e: &BytesStart<'_>, local: &[u8]) -> XmlResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a signed integer attribute.
pub fn attr_i64(e: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| atoi_simd::parse::<i64>(&attr.value).ok())
}

/// Parse an unsigned integer attribute.
pub fn attr_u32(e: &BytesStart<'_>, key: &[u8]) -> Option<u32> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| atoi_simd::parse::<u32>(&attr.value).ok())
}

/// Append a text event to `out`.
pub fn push_text(out: &mut String, text: &BytesText<'_>) -> XmlResult<()> {
    out.push_str(&text.decode()?);
    Ok(())
}

/// Append the character an entity or character reference stands for.
///
/// quick-xml reports `&amp;` and `&#38;` inside text as separate events.
/// Unknown named entities are kept literally.
pub fn push_entity(out: &mut String, reference: &BytesRef<'_>) -> XmlResult<()> {
    if let Some(ch) = reference.resolve_char_ref()? {
        out.push(ch);
        return Ok(());
    }
    let name = reference.decode()?;
    match resolve_predefined_entity(&name) {
        Some(value) => out.push_str(value),
        None => {
            out.push('&');
            out.push_str(&name);
            out.push(';');
        },
    }
    Ok(())
}

/// Append source bytes that are spliced back into a part unchanged.
pub fn push_raw(out: &mut String, raw: &[u8]) -> XmlResult<()> {
    out.push_str(std::str::from_utf8(raw).map_err(EncodingError::from)?);
    Ok(())
}

/// Source bytes of the element whose start tag began at offset `start`.
///
/// For a `Start` event (`opened`) the rest of the element is consumed.
/// `xml` must be the document the reader walks.
pub fn capture_element(
    reader: &mut Reader<&[u8]>,
    xml: &[u8],
    start: usize,
    e: &BytesStart<'_>,
    opened: bool,
) -> XmlResult<Vec<u8>> {
    if opened {
        reader.read_to_end(e.name())?;
    }
    let end = reader.buffer_position() as usize;
    Ok(xml[start..end].to_vec())
}

/// Source bytes between the tags of an element whose start tag was just read.
pub fn capture_content(reader: &mut Reader<&[u8]>, xml: &[u8], e: &BytesStart<'_>) -> XmlResult<Vec<u8>> {
    let span = reader.read_to_end(e.name())?;
    Ok(xml[span.start as usize..span.end as usize].to_vec())
}

/// Stack of local element names from the loop's entry point downwards.
///
/// Decoders push on `Start`, pop on `End` and ask questions such as "am I
/// directly inside `spPr/solidFill`?" without keeping a flag per element.
#[derive(Debug, Default)]
pub struct ElementPath {
    names: Vec<Vec<u8>>,
}

impl ElementPath {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, local: &[u8]) {
        self.names.push(local.to_vec());
    }

    /// Pop the innermost element; returns `false` when the path was already empty.
    #[inline]
    pub fn pop(&mut self) -> bool {
        self.names.pop().is_some()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// True if the innermost elements are exactly `suffix`, outermost first.
    pub fn ends_with(&self, suffix: &[&[u8]]) -> bool {
        if suffix.len() > self.names.len() {
            return false;
        }
        let start = self.names.len() - suffix.len();
        self.names[start..]
            .iter()
            .zip(suffix)
            .all(|(have, want)| have.as_slice() == *want)
    }

    /// True if any open element has the given local name.
    pub fn contains(&self, local: &[u8]) -> bool {
        self.names.iter().any(|n| n.as_slice() == local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    #[test]
    fn test_attr_lookup_distinguishes_prefix() {
        let xml = br#"<p:sldId id="256" r:id="rId7"/>"#;
        let mut reader = xml_reader(xml);
        match reader.read_event().unwrap() {
            Event::Empty(e) => {
                assert_eq!(attr_value(&e, b"id").unwrap().as_deref(), Some("256"));
                assert_eq!(attr_prefixed(&e, b"id").unwrap().as_deref(), Some("rId7"));
                assert_eq!(attr_u32(&e, b"id"), Some(256));
            },
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_attr_unescapes_entities() {
        let xml = br#"<a:t name="A &amp; B"/>"#;
        let mut reader = xml_reader(xml);
        if let Event::Empty(e) = reader.read_event().unwrap() {
            assert_eq!(attr_value(&e, b"name").unwrap().as_deref(), Some("A & B"));
        } else {
            panic!("expected empty element");
        }
    }

    #[test]
    fn test_text_and_entities() {
        let mut reader = xml_reader(b"<a:t>Q&amp;A &#x41;&#66; &nbsp;</a:t>");
        let mut text = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Text(e) => push_text(&mut text, &e).unwrap(),
                Event::GeneralRef(e) => push_entity(&mut text, &e).unwrap(),
                Event::End(_) => break,
                _ => {},
            }
        }
        assert_eq!(text, "Q&A AB &nbsp;");
    }

    #[test]
    fn test_invalid_utf8_attribute_is_an_error() {
        let xml = b"<a:latin typeface=\"\xFF\"/>";
        let mut reader = xml_reader(xml);
        if let Event::Empty(e) = reader.read_event().unwrap() {
            assert!(attr_value(&e, b"typeface").is_err());
        } else {
            panic!("expected empty element");
        }
    }

    #[test]
    fn test_capture_element() {
        let xml = br#"<p:spPr><a:ln w="12700"><a:noFill/></a:ln><a:effectLst/></p:spPr>"#;
        let mut reader = xml_reader(xml);
        let mut captured = Vec::new();
        loop {
            let start = reader.buffer_position() as usize;
            match reader.read_event().unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"ln" => {
                    captured.push(capture_element(&mut reader, xml, start, &e, true).unwrap());
                },
                Event::Empty(e) => captured.push(capture_element(&mut reader, xml, start, &e, false).unwrap()),
                Event::Eof => break,
                _ => {},
            }
        }
        assert_eq!(captured[0], br#"<a:ln w="12700"><a:noFill/></a:ln>"#.to_vec());
        assert_eq!(captured[1], b"<a:effectLst/>".to_vec());
    }

    #[test]
    fn test_element_path() {
        let mut path = ElementPath::new();
        path.push(b"spPr");
        path.push(b"solidFill");
        assert!(path.ends_with(&[b"spPr", b"solidFill"]));
        assert!(!path.ends_with(&[b"ln", b"solidFill"]));
        assert!(path.contains(b"spPr"));
        assert!(path.pop());
        assert!(path.pop());
        assert!(!path.pop());
    }
}
