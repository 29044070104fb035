/// Slide parts.
///
/// Corresponds to `/ppt/slides/slideN.xml`. A new slide starts with an empty
/// copy of every placeholder of its layout.
use super::layout::SlideLayoutPart;
use super::{PML_NAMESPACES, SlideDocument, XML_DECLARATION, XmlPart};
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::pptx::shapes::{Picture, Position, Shape, ShapeKind, ShapeTree};

#[derive(Debug, Clone, PartialEq)]
pub struct SlidePart {
    doc: SlideDocument,
}

impl SlidePart {
    pub fn new(tree: ShapeTree) -> Self {
        let mut prefix = String::with_capacity(256);
        prefix.push_str(XML_DECLARATION);
        prefix.push_str("<p:sld ");
        prefix.push_str(PML_NAMESPACES);
        prefix.push_str("><p:cSld>");
        let suffix = "</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>".to_string();
        Self {
            doc: SlideDocument::from_parts(prefix, suffix, tree),
        }
    }

    /// A slide holding an empty copy of each placeholder of `layout`.
    ///
    /// Type, idx and position are kept; text is dropped and geometry is `rect`.
    pub fn from_layout(layout: &SlideLayoutPart) -> Self {
        let mut tree = ShapeTree::new();
        for shape in layout.tree().get_placeholders() {
            // Picture, table and chart placeholders start out as an empty p:sp
            // carrying the same marker, as PowerPoint does
            let clone = match shape {
                ShapeKind::Shape(s) => Shape::from_placeholder(s),
                other => {
                    let mut s = Shape::new(other.name(), Position::default());
                    s.id = other.id();
                    s.position = other.position();
                    s.placeholder = other.placeholder().cloned();
                    s.text_frame = Some(Default::default());
                    s
                },
            };
            tree.add_shape(ShapeKind::Shape(clone));
        }
        Self::new(tree)
    }

    #[inline]
    pub fn tree(&self) -> &ShapeTree {
        &self.doc.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut ShapeTree {
        &mut self.doc.tree
    }

    /// Relationship ids referenced by pictures and charts on the slide.
    pub fn referenced_r_ids(&self) -> Vec<&str> {
        self.doc
            .tree
            .iter()
            .filter_map(|shape| match shape {
                ShapeKind::Picture(Picture { r_embed, .. }) => Some(r_embed.as_str()),
                ShapeKind::Chart(chart) => Some(chart.r_id.as_str()),
                _ => None,
            })
            .filter(|r_id| !r_id.is_empty())
            .collect()
    }
}

impl XmlPart for SlidePart {
    const CONTENT_TYPE: &'static str = ct::PML_SLIDE;

    fn from_xml(xml: &[u8]) -> Result<Self> {
        Ok(Self {
            doc: SlideDocument::parse(xml)?,
        })
    }

    fn to_xml(&self) -> Result<Vec<u8>> {
        self.doc.to_xml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::shapes::Placeholder;

    fn layout() -> SlideLayoutPart {
        let mut tree = ShapeTree::new();
        let mut title = Shape::new("Title 1", Position::new(685_800, 2_130_425, 7_772_400, 1_470_025));
        title.placeholder = Some(Placeholder::new("ctrTitle", None));
        title.set_text("Click to edit");
        tree.add_shape(ShapeKind::Shape(title));

        let mut sub = Shape::new("Subtitle 2", Position::new(1_371_600, 3_886_200, 6_400_800, 1_752_600));
        sub.placeholder = Some(Placeholder::new("subTitle", Some(1)));
        sub.preset_geometry = Some("roundRect".to_string());
        tree.add_shape(ShapeKind::Shape(sub));

        tree.add_shape(ShapeKind::Shape(Shape::text_box("decoration", Position::default())));
        SlideLayoutPart::new("Title Slide", Some("title"), tree)
    }

    #[test]
    fn test_from_layout_clones_placeholders() {
        let layout = layout();
        let slide = SlidePart::from_layout(&layout);
        assert_eq!(slide.tree().len(), 2);

        for ph in layout.tree().get_placeholders() {
            let p = ph.placeholder().unwrap();
            let clone = slide.tree().get_placeholder(Some(&p.ph_type), p.idx).unwrap();
            assert_eq!(clone.position(), ph.position());
            assert_eq!(clone.text().as_deref(), Some(""));
            assert_eq!(clone.as_shape().unwrap().preset_geometry.as_deref(), Some("rect"));
        }
    }

    #[test]
    fn test_from_layout_keeps_table_and_chart_placeholders() {
        let layout = SlideLayoutPart::from_xml(
            br#"<p:sldLayout xmlns:p="p" xmlns:a="a" xmlns:r="r"><p:cSld name="Table"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="4" name="Table Placeholder 3"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr><p:ph type="tbl" idx="1"/></p:nvPr></p:nvGraphicFramePr><p:xfrm><a:off x="10" y="20"/><a:ext cx="30" cy="40"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblGrid><a:gridCol w="30"/></a:tblGrid><a:tr h="40"><a:tc><a:txBody><a:bodyPr/><a:p/></a:txBody></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame></p:spTree></p:cSld></p:sldLayout>"#,
        )
        .unwrap();
        assert_eq!(layout.tree().get_placeholders().len(), 1);

        let slide = SlidePart::from_layout(&layout);
        let clone = slide.tree().get_placeholder(Some("tbl"), Some(1)).unwrap();
        assert_eq!(clone.id(), 4);
        assert_eq!(clone.name(), "Table Placeholder 3");
        assert_eq!(clone.position(), Some(Position::new(10, 20, 30, 40)));
        assert!(clone.as_shape().is_some());

        let xml = String::from_utf8(slide.to_xml().unwrap()).unwrap();
        assert!(xml.contains(r#"<p:sp><p:nvSpPr><p:cNvPr id="4" name="Table Placeholder 3"/>"#));
        assert!(xml.contains(r#"<p:ph type="tbl" idx="1"/>"#));
        assert!(!xml.contains("graphicFrame"));
    }

    #[test]
    fn test_slide_xml_round_trip() {
        let mut slide = SlidePart::from_layout(&layout());
        slide
            .tree_mut()
            .get_placeholder_mut(Some("ctrTitle"), None)
            .and_then(ShapeKind::as_shape_mut)
            .unwrap()
            .set_text("Quarterly review");

        let xml = slide.to_xml().unwrap();
        let text = String::from_utf8_lossy(&xml);
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<p:sld xmlns:a="));
        assert!(text.ends_with("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"));

        let again = SlidePart::from_xml(&xml).unwrap();
        assert_eq!(
            again.tree().get_placeholder(Some("ctrTitle"), None).unwrap().text().as_deref(),
            Some("Quarterly review")
        );
        assert_eq!(again.tree().next_id(), slide.tree().next_id());
    }
}
