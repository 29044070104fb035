/// Typed XML parts of a .pptx package.
///
/// Each part type decodes the raw bytes the [`Package`] holds and encodes
/// itself back; the package arena stays the only owner of part bytes.
/// Slides, layouts and masters share [`SlideDocument`]: the parsed shape tree
/// plus the untouched XML around it.
pub mod layout;
pub mod master;
pub mod presentation;
pub mod slide;
pub mod theme;

use std::ops::Range;

use quick_xml::events::Event;

use crate::common::xml::{ElementPath, attr_value, xml_reader};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::Package;
use crate::ooxml::pptx::shapes::ShapeTree;

pub use layout::{LayoutInfo, PlaceholderInfo, SlideLayoutPart, get_layout_by_index, get_layout_by_name, get_layout_info_list, layout_part_names};
pub use master::{LayoutRef, SlideMasterPart};
pub use presentation::{MasterRef, PresentationPart, SlideRef};
pub use slide::SlidePart;
pub use theme::{ThemeColor, ThemeFonts, ThemePart, theme_part_name};

pub(crate) const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

/// Namespace declarations carried by every PresentationML root element.
pub(crate) const PML_NAMESPACES: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

/// A part that lives in the package as one XML document.
pub trait XmlPart: Sized {
    /// Content type registered for the part.
    const CONTENT_TYPE: &'static str;

    fn from_xml(xml: &[u8]) -> Result<Self>;

    fn to_xml(&self) -> Result<Vec<u8>>;

    /// Decode the part stored under `name`.
    fn load(package: &Package, name: &str) -> Result<Self> {
        Self::from_xml(package.part(name)?)
    }

    /// Encode the part and store it under `name`.
    fn store(&self, package: &mut Package, name: &str) -> Result<()> {
        package.set_part(name, self.to_xml()?, Some(Self::CONTENT_TYPE))?;
        Ok(())
    }
}

/// A slide, layout or master document split around its `p:spTree`.
///
/// Everything outside the shape tree (background, color map overrides,
/// transitions, extension lists) is kept byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDocument {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    /// `p:cSld@name`
    pub name: Option<String>,
    /// `type` attribute of the root element (layouts declare one)
    pub root_type: Option<String>,
    pub tree: ShapeTree,
}

impl SlideDocument {
    /// Assemble a document from the XML that goes before and after the tree.
    pub(crate) fn from_parts(prefix: String, suffix: String, tree: ShapeTree) -> Self {
        Self {
            prefix: prefix.into_bytes(),
            suffix: suffix.into_bytes(),
            name: None,
            root_type: None,
            tree,
        }
    }

    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = xml_reader(xml);
        let mut name = None;
        let mut root_type = None;
        let mut seen_root = false;

        loop {
            let before = reader.buffer_position() as usize;
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    if !seen_root {
                        seen_root = true;
                        root_type = attr_value(e, b"type")?;
                    }
                    match local.as_ref() {
                        b"cSld" => name = attr_value(e, b"name")?,
                        b"spTree" => {
                            let tree = if opened {
                                ShapeTree::parse(&mut reader, xml)?
                            } else {
                                ShapeTree::new()
                            };
                            let after = reader.buffer_position() as usize;
                            return Ok(Self {
                                prefix: xml[..before].to_vec(),
                                suffix: xml[after..].to_vec(),
                                name,
                                root_type,
                                tree,
                            });
                        },
                        _ => {},
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Err(OoxmlError::Xml("document has no p:spTree".to_string()))
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut tree = String::with_capacity(1024);
        self.tree.write_xml(&mut tree)?;

        let mut out = Vec::with_capacity(self.prefix.len() + tree.len() + self.suffix.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(tree.as_bytes());
        out.extend_from_slice(&self.suffix);
        Ok(out)
    }
}

/// Byte range of the first element whose path ends with `suffix`.
///
/// The path starts at the document root, so `&[b"presentation", b"sldSz"]`
/// only matches a direct child of the root.
pub(crate) fn element_span(xml: &[u8], suffix: &[&[u8]]) -> Result<Option<Range<usize>>> {
    let mut reader = xml_reader(xml);
    let mut path = ElementPath::new();
    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let opened = matches!(event, Event::Start(_));
                path.push(e.local_name().as_ref());
                if path.ends_with(suffix) {
                    if opened {
                        reader.read_to_end(e.name())?;
                    }
                    return Ok(Some(before..reader.buffer_position() as usize));
                }
                if !opened {
                    path.pop();
                }
            },
            Event::End(_) => {
                path.pop();
            },
            Event::Eof => return Ok(None),
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<p:sld xmlns:a="a" xmlns:r="r" xmlns:p="p"><p:cSld name="Intro"><p:bg><p:bgRef idx="1001"/></p:bg>"#,
        r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/>"#,
        r#"<p:txBody><a:bodyPr/><a:p><a:r><a:t>Hello</a:t></a:r></a:p></p:txBody></p:sp>"#,
        r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr><p:transition spd="slow"/></p:sld>"#
    );

    #[test]
    fn test_document_keeps_surroundings() {
        let doc = SlideDocument::parse(SLIDE.as_bytes()).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Intro"));
        assert_eq!(doc.root_type, None);
        assert_eq!(doc.tree.len(), 1);

        let xml = String::from_utf8(doc.to_xml().unwrap()).unwrap();
        assert!(xml.contains(r#"<p:bg><p:bgRef idx="1001"/></p:bg><p:spTree>"#));
        assert!(xml.ends_with(r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr><p:transition spd="slow"/></p:sld>"#));

        let again = SlideDocument::parse(xml.as_bytes()).unwrap();
        assert_eq!(again.tree.get_shape_by_id(2).unwrap().text().as_deref(), Some("Hello"));
    }

    #[test]
    fn test_document_without_tree() {
        let err = SlideDocument::parse(b"<p:sld><p:cSld/></p:sld>").unwrap_err();
        assert!(matches!(err, OoxmlError::Xml(_)));
    }

    #[test]
    fn test_element_span() {
        let xml = br#"<p:presentation><p:sldIdLst><p:sldId id="256"/></p:sldIdLst><p:sldSz cx="1" cy="2"/></p:presentation>"#;
        let span = element_span(xml, &[b"presentation", b"sldIdLst"]).unwrap().unwrap();
        assert_eq!(&xml[span], br#"<p:sldIdLst><p:sldId id="256"/></p:sldIdLst>"#.as_slice());

        let span = element_span(xml, &[b"sldSz"]).unwrap().unwrap();
        assert_eq!(&xml[span], br#"<p:sldSz cx="1" cy="2"/>"#.as_slice());

        assert!(element_span(xml, &[b"notesSz"]).unwrap().is_none());
    }
}
