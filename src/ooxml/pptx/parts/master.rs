/// Slide master parts.
///
/// Corresponds to `/ppt/slideMasters/slideMasterN.xml`. A master is the
/// shared ancestor of its layouts: it lists them in `p:sldLayoutIdLst`, maps
/// scheme colors through `p:clrMap` and carries the placeholders layouts
/// inherit positions from.
use std::fmt::Write as FmtWrite;

use quick_xml::events::Event;

use super::presentation::MIN_MASTER_ID;
use super::{PML_NAMESPACES, SlideDocument, XML_DECLARATION, XmlPart};
use crate::common::xml::{ElementPath, attr_prefixed, attr_u32, xml_reader};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::pptx::shapes::{Placeholder, Position, Shape, ShapeKind, ShapeTree};

/// The `p:clrMap` every generated master uses.
const DEFAULT_COLOR_MAP: [(&str, &str); 12] = [
    ("bg1", "lt1"),
    ("tx1", "dk1"),
    ("bg2", "lt2"),
    ("tx2", "dk2"),
    ("accent1", "accent1"),
    ("accent2", "accent2"),
    ("accent3", "accent3"),
    ("accent4", "accent4"),
    ("accent5", "accent5"),
    ("accent6", "accent6"),
    ("hlink", "hlink"),
    ("folHlink", "folHlink"),
];

/// Master placeholders laid out for a 10in x 7.5in slide; scaled to the
/// actual slide size.
const MASTER_PLACEHOLDERS: [(&str, &str, Position); 5] = [
    ("title", "Title Placeholder 1", Position::new(457_200, 274_638, 8_229_600, 1_143_000)),
    ("body", "Text Placeholder 2", Position::new(457_200, 1_600_200, 8_229_600, 4_525_963)),
    ("dt", "Date Placeholder 3", Position::new(457_200, 6_356_350, 2_133_600, 365_125)),
    ("ftr", "Footer Placeholder 4", Position::new(3_124_200, 6_356_350, 2_895_600, 365_125)),
    ("sldNum", "Slide Number Placeholder 5", Position::new(6_553_200, 6_356_350, 2_133_600, 365_125)),
];

const TEXT_STYLES: &str = concat!(
    "<p:txStyles>",
    r#"<p:titleStyle><a:lvl1pPr algn="l"><a:defRPr sz="4400" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mj-lt"/></a:defRPr></a:lvl1pPr></p:titleStyle>"#,
    r#"<p:bodyStyle><a:lvl1pPr marL="228600" indent="-228600"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/><a:defRPr sz="2800" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:bodyStyle>"#,
    r#"<p:otherStyle><a:lvl1pPr><a:defRPr sz="1800" kern="1200"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill><a:latin typeface="+mn-lt"/></a:defRPr></a:lvl1pPr></p:otherStyle>"#,
    "</p:txStyles>"
);

/// An entry of `p:sldLayoutIdLst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRef {
    pub id: u32,
    pub r_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideMasterPart {
    doc: SlideDocument,
    layout_refs: Vec<LayoutRef>,
    color_map: Vec<(String, String)>,
}

impl SlideMasterPart {
    /// A master for a slide of `width` x `height` EMU whose layouts are
    /// related under `layout_rids`, in order.
    pub fn new<S: AsRef<str>>(width: i64, height: i64, layout_rids: &[S]) -> Self {
        let mut tree = ShapeTree::new();
        for (ph_type, name, base) in MASTER_PLACEHOLDERS {
            let mut shape = Shape::new(name, scale(base, width, height));
            shape.placeholder = Some(Placeholder::new(ph_type, None));
            shape.text_frame = Some(Default::default());
            tree.add_shape(ShapeKind::Shape(shape));
        }

        let layout_refs: Vec<LayoutRef> = layout_rids
            .iter()
            .enumerate()
            .map(|(i, r_id)| LayoutRef {
                id: MIN_MASTER_ID + 1 + i as u32,
                r_id: r_id.as_ref().to_string(),
            })
            .collect();
        let color_map: Vec<(String, String)> = DEFAULT_COLOR_MAP
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut prefix = String::with_capacity(256);
        prefix.push_str(XML_DECLARATION);
        let _ = write!(
            prefix,
            r#"<p:sldMaster {}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>"#,
            PML_NAMESPACES
        );

        let mut suffix = String::from("</p:cSld><p:clrMap");
        for (k, v) in &color_map {
            let _ = write!(suffix, r#" {}="{}""#, k, v);
        }
        suffix.push_str("/>");
        if layout_refs.is_empty() {
            suffix.push_str("<p:sldLayoutIdLst/>");
        } else {
            suffix.push_str("<p:sldLayoutIdLst>");
            for l in &layout_refs {
                let _ = write!(suffix, r#"<p:sldLayoutId id="{}" r:id="{}"/>"#, l.id, l.r_id);
            }
            suffix.push_str("</p:sldLayoutIdLst>");
        }
        suffix.push_str(TEXT_STYLES);
        suffix.push_str("</p:sldMaster>");

        Self {
            doc: SlideDocument::from_parts(prefix, suffix, tree),
            layout_refs,
            color_map,
        }
    }

    /// Layout references in `p:sldLayoutIdLst` order.
    #[inline]
    pub fn layout_refs(&self) -> &[LayoutRef] {
        &self.layout_refs
    }

    /// `p:clrMap` entries in document order, e.g. `("bg1", "lt1")`.
    #[inline]
    pub fn color_map(&self) -> &[(String, String)] {
        &self.color_map
    }

    #[inline]
    pub fn tree(&self) -> &ShapeTree {
        &self.doc.tree
    }

    /// Position a layout placeholder of `ph_type` inherits when it has no
    /// transform of its own.
    pub fn inherited_bounds(&self, ph_type: &str) -> Option<Position> {
        let master_type = match ph_type {
            "title" | "ctrTitle" => "title",
            "dt" | "ftr" | "sldNum" => ph_type,
            _ => "body",
        };
        self.doc
            .tree
            .get_placeholder(Some(master_type), None)
            .and_then(ShapeKind::position)
    }
}

fn scale(base: Position, width: i64, height: i64) -> Position {
    let sx = |v: i64| v * width / 9_144_000;
    let sy = |v: i64| v * height / 6_858_000;
    Position::new(sx(base.x), sy(base.y), sx(base.cx), sy(base.cy))
}

impl XmlPart for SlideMasterPart {
    const CONTENT_TYPE: &'static str = ct::PML_SLIDE_MASTER;

    fn from_xml(xml: &[u8]) -> Result<Self> {
        let doc = SlideDocument::parse(xml)?;

        let mut reader = xml_reader(xml);
        let mut path = ElementPath::new();
        let mut layout_refs = Vec::new();
        let mut color_map = Vec::new();

        loop {
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    match local.as_ref() {
                        b"clrMap" if path.depth() == 1 => {
                            color_map.clear();
                            for attr in e.attributes() {
                                let attr = attr.map_err(quick_xml::Error::from)?;
                                if attr.key.prefix().is_some() || attr.key.as_ref() == b"xmlns" {
                                    continue;
                                }
                                let key = std::str::from_utf8(attr.key.as_ref())
                                    .map_err(|err| OoxmlError::Xml(err.to_string()))?;
                                color_map.push((key.to_string(), attr.unescape_value()?.into_owned()));
                            }
                        },
                        b"sldLayoutId" if path.ends_with(&[b"sldLayoutIdLst"]) => {
                            if let (Some(id), Some(r_id)) = (attr_u32(e, b"id"), attr_prefixed(e, b"id")?) {
                                layout_refs.push(LayoutRef { id, r_id });
                            }
                        },
                        // Shapes are already in `doc`
                        b"cSld" if opened => {
                            reader.read_to_end(e.name())?;
                            continue;
                        },
                        _ => {},
                    }
                    if opened {
                        path.push(local.as_ref());
                    }
                },
                Event::End(_) => {
                    path.pop();
                },
                Event::Eof => break,
                _ => {},
            }
        }

        Ok(Self {
            doc,
            layout_refs,
            color_map,
        })
    }

    fn to_xml(&self) -> Result<Vec<u8>> {
        self.doc.to_xml()
    }
}
