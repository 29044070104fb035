/// Auto shapes (`p:sp`): text boxes, placeholders and preset geometries.
use crate::common::xml::{ElementPath, Retained, attr_value, capture_element, escape_xml, push_raw, xml_reader};
use crate::ooxml::error::{OoxmlError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as FmtWrite;

use super::base::{
    Claim, CommonProps, Orientation, Placeholder, Position, ShapeExtras, write_c_nv_pr, write_nv_pr, write_retained,
    xml_flag,
};
use super::textframe::TextBody;

/// A generic shape.
///
/// May carry a placeholder marker, a text frame, a preset geometry and a
/// solid fill. Anything else the source element held (outline, effects,
/// style references, custom geometry) is kept and written back.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::shapes::{Position, Shape};
///
/// let mut shape = Shape::text_box("Note", Position::new(0, 0, 914400, 457200));
/// shape.set_text("Updated\nnote");
/// assert_eq!(shape.text(), "Updated\nnote");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub id: u32,
    pub name: String,
    /// `None` when the shape inherits its geometry from a layout placeholder
    pub position: Option<Position>,
    pub orientation: Orientation,
    pub placeholder: Option<Placeholder>,
    pub text_frame: Option<TextBody>,
    /// Preset geometry such as `rect` or `ellipse`; `None` for custom geometry
    pub preset_geometry: Option<String>,
    /// Solid fill as six hex digits
    pub fill: Option<String>,
    pub is_text_box: bool,
    pub(crate) source: ShapeSource,
}

/// Source bytes behind the modelled parts of a `p:sp`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ShapeSource {
    non_visual: Retained<bool>,
    geometry: Retained<Option<String>>,
    fill: Retained<Option<String>>,
    extras: ShapeExtras,
}

impl Shape {
    /// A plain shape; the id is assigned when added to a tree.
    pub fn new<S: Into<String>>(name: S, position: Position) -> Self {
        Self {
            name: name.into(),
            position: Some(position),
            preset_geometry: Some("rect".to_string()),
            ..Default::default()
        }
    }

    /// A text box holding `text`, one paragraph per line.
    pub fn text_box(text: &str, position: Position) -> Self {
        let mut body = TextBody::from_text(text);
        body.body_props.wrap = Some("square".to_string());
        body.body_props.shape_autofit = true;
        Self {
            name: "TextBox".to_string(),
            position: Some(position),
            text_frame: Some(body),
            preset_geometry: Some("rect".to_string()),
            is_text_box: true,
            ..Default::default()
        }
    }

    /// An empty copy of a layout placeholder for a new slide.
    ///
    /// Keeps id, name, type, idx and position; the text frame is empty and the
    /// geometry is `rect`.
    pub fn from_placeholder(source: &Shape) -> Self {
        Self {
            id: source.id,
            name: source.name.clone(),
            position: source.position,
            placeholder: source.placeholder.clone(),
            text_frame: Some(TextBody::new()),
            preset_geometry: Some("rect".to_string()),
            ..Default::default()
        }
    }

    /// Text of the text frame, empty when there is none.
    pub fn text(&self) -> String {
        self.text_frame.as_ref().map(TextBody::text).unwrap_or_default()
    }

    /// Replace the text, creating the text frame if needed.
    pub fn set_text(&mut self, text: &str) {
        self.text_frame
            .get_or_insert_with(TextBody::new)
            .set_text(text);
    }

    /// Decode a `p:sp` element; the reader is positioned after its start tag
    /// and `xml` is the document it walks.
    pub(crate) fn parse(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<Self> {
        let mut common = CommonProps::default();
        let mut shape = Shape::default();
        let mut path = ElementPath::new();

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    let name = local.as_ref();

                    match common.read(reader, xml, start, e, opened, &path)? {
                        Claim::Element => continue,
                        Claim::Attributes => {},
                        Claim::Unclaimed if path.is_empty() => match name {
                            b"nvSpPr" | b"spPr" => {},
                            b"txBody" => {
                                shape.text_frame = Some(if opened {
                                    TextBody::parse(reader, xml)?
                                } else {
                                    TextBody::new()
                                });
                                continue;
                            },
                            b"style" => {
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                shape.source.extras.style = Retained::from_raw(raw);
                                continue;
                            },
                            _ => {
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                shape.source.extras.tail.extend(&raw);
                                continue;
                            },
                        },
                        Claim::Unclaimed if path.depth() == 1 && path.ends_with(&[b"nvSpPr"]) => {
                            if name == b"cNvSpPr" {
                                shape.is_text_box = xml_flag(e, b"txBox")?;
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                shape.source.non_visual = Retained::new(shape.is_text_box, raw);
                                continue;
                            }
                        },
                        Claim::Unclaimed if path.depth() == 1 && path.ends_with(&[b"spPr"]) => {
                            let raw = capture_element(reader, xml, start, e, opened)?;
                            match name {
                                b"prstGeom" => {
                                    shape.preset_geometry = attr_value(e, b"prst")?;
                                    shape.source.geometry = Retained::new(shape.preset_geometry.clone(), raw);
                                },
                                b"custGeom" => {
                                    shape.preset_geometry = None;
                                    shape.source.geometry = Retained::new(None, raw);
                                },
                                b"noFill" | b"solidFill" | b"gradFill" | b"blipFill" | b"pattFill" | b"grpFill" => {
                                    shape.fill = if name == b"solidFill" { solid_rgb(&raw)? } else { None };
                                    shape.source.fill = Retained::new(shape.fill.clone(), raw);
                                },
                                _ => shape.source.extras.sp_pr.extend(&raw),
                            }
                            continue;
                        },
                        Claim::Unclaimed => {},
                    }

                    if opened {
                        path.push(name);
                    }
                },
                Event::End(_) => {
                    if !path.pop() {
                        break;
                    }
                },
                Event::Eof => return Err(OoxmlError::Xml("unexpected end of p:sp".to_string())),
                _ => {},
            }
        }

        shape.id = common.id;
        shape.name = common.name;
        shape.position = common.position;
        shape.orientation = common.orientation;
        shape.placeholder = common.placeholder;
        let extras = &mut shape.source.extras;
        extras.c_nv_pr_attrs = common.extras.c_nv_pr_attrs;
        extras.c_nv_pr = common.extras.c_nv_pr;
        extras.nv_pr = common.extras.nv_pr;
        Ok(shape)
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        let source = &self.source;
        xml.push_str("<p:sp><p:nvSpPr>");
        write_c_nv_pr(xml, self.id, &self.name, None, &source.extras)?;
        if let Some(raw) = source.non_visual.get(&self.is_text_box) {
            push_raw(xml, raw)?;
        } else if self.is_text_box {
            xml.push_str(r#"<p:cNvSpPr txBox="1"/>"#);
        } else if self.placeholder.is_some() {
            xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#);
        } else {
            xml.push_str("<p:cNvSpPr/>");
        }
        write_nv_pr(xml, self.placeholder.as_ref(), &source.extras)?;
        xml.push_str("</p:nvSpPr>");

        let geometry = source.geometry.get(&self.preset_geometry);
        let fill = source.fill.get(&self.fill);
        if self.position.is_none()
            && self.preset_geometry.is_none()
            && geometry.is_none()
            && self.fill.is_none()
            && fill.is_none()
            && source.extras.sp_pr.is_empty()
        {
            xml.push_str("<p:spPr/>");
        } else {
            xml.push_str("<p:spPr>");
            if let Some(position) = self.position {
                position.write_oriented_xfrm(xml, "a:xfrm", self.orientation)?;
            }
            match (geometry, &self.preset_geometry) {
                (Some(raw), _) => push_raw(xml, raw)?,
                (None, Some(geom)) => {
                    write!(xml, r#"<a:prstGeom prst="{}"><a:avLst/></a:prstGeom>"#, escape_xml(geom))?
                },
                (None, None) => {},
            }
            match (fill, &self.fill) {
                (Some(raw), _) => push_raw(xml, raw)?,
                (None, Some(rgb)) => {
                    write!(xml, r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, escape_xml(rgb))?
                },
                (None, None) => {},
            }
            write_retained(xml, &source.extras.sp_pr)?;
            xml.push_str("</p:spPr>");
        }
        write_retained(xml, &source.extras.style)?;

        if let Some(ref body) = self.text_frame {
            body.write_xml(xml, "p:txBody")?;
        }
        write_retained(xml, &source.extras.tail)?;

        xml.push_str("</p:sp>");
        Ok(())
    }
}

/// `srgbClr` value of a captured `a:solidFill`, if it holds one.
fn solid_rgb(raw: &[u8]) -> Result<Option<String>> {
    let mut reader = xml_reader(raw);
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if depth == 1 && e.local_name().as_ref() == b"srgbClr" => {
                return Ok(attr_value(e, b"val")?);
            },
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => return Ok(None),
            _ => {},
        }
    }
}
