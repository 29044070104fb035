/// Picture shapes (`p:pic`).
use crate::common::xml::{ElementPath, Retained, attr_i64, attr_prefixed, capture_element, push_raw, xml_reader};
use crate::ooxml::error::{OoxmlError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fmt::Write as FmtWrite;

use super::base::{
    Claim, CommonProps, Orientation, Placeholder, Position, ShapeExtras, write_c_nv_pr, write_nv_pr, write_retained,
};

/// Crop insets of a picture (`a:srcRect`), in thousandths of a percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crop {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Crop {
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// A picture shape.
///
/// The image bytes live in their own part; `r_embed` is the id of the
/// slide's IMAGE relationship pointing at it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Picture {
    pub id: u32,
    pub name: String,
    pub position: Option<Position>,
    pub orientation: Orientation,
    pub r_embed: String,
    pub description: Option<String>,
    pub crop: Option<Crop>,
    pub placeholder: Option<Placeholder>,
    pub(crate) source: PictureSource,
}

/// Source bytes behind the modelled parts of a `p:pic`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PictureSource {
    non_visual: Retained,
    blip_fill: Retained<(String, Option<Crop>)>,
    geometry: Retained,
    extras: ShapeExtras,
}

impl Picture {
    pub fn new<S: Into<String>>(r_embed: S, position: Position) -> Self {
        Self {
            name: "Picture".to_string(),
            position: Some(position),
            r_embed: r_embed.into(),
            ..Default::default()
        }
    }

    /// Decode a `p:pic` element; the reader is positioned after its start tag
    /// and `xml` is the document it walks.
    pub(crate) fn parse(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<Self> {
        let mut common = CommonProps::default();
        let mut pic = Picture::default();
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
                            b"nvPicPr" | b"spPr" => {},
                            b"blipFill" => {
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                let (r_embed, crop) = read_blip_fill(&raw)?;
                                pic.r_embed = r_embed.clone();
                                pic.crop = crop;
                                pic.source.blip_fill = Retained::new((r_embed, crop), raw);
                                continue;
                            },
                            b"style" => {
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                pic.source.extras.style = Retained::from_raw(raw);
                                continue;
                            },
                            _ => {
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                pic.source.extras.tail.extend(&raw);
                                continue;
                            },
                        },
                        Claim::Unclaimed if path.depth() == 1 && path.ends_with(&[b"nvPicPr"]) => {
                            if name == b"cNvPicPr" {
                                let raw = capture_element(reader, xml, start, e, opened)?;
                                pic.source.non_visual = Retained::from_raw(raw);
                                continue;
                            }
                        },
                        Claim::Unclaimed if path.depth() == 1 && path.ends_with(&[b"spPr"]) => {
                            let raw = capture_element(reader, xml, start, e, opened)?;
                            match name {
                                b"prstGeom" | b"custGeom" => pic.source.geometry = Retained::from_raw(raw),
                                _ => pic.source.extras.sp_pr.extend(&raw),
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
                Event::Eof => return Err(OoxmlError::Xml("unexpected end of p:pic".to_string())),
                _ => {},
            }
        }

        pic.id = common.id;
        pic.name = common.name;
        pic.description = common.descr;
        pic.position = common.position;
        pic.orientation = common.orientation;
        pic.placeholder = common.placeholder;
        let extras = &mut pic.source.extras;
        extras.c_nv_pr_attrs = common.extras.c_nv_pr_attrs;
        extras.c_nv_pr = common.extras.c_nv_pr;
        extras.nv_pr = common.extras.nv_pr;
        Ok(pic)
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        let source = &self.source;
        xml.push_str("<p:pic><p:nvPicPr>");
        write_c_nv_pr(xml, self.id, &self.name, self.description.as_deref(), &source.extras)?;
        match source.non_visual.raw() {
            Some(raw) => push_raw(xml, raw)?,
            None => xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>"#),
        }
        write_nv_pr(xml, self.placeholder.as_ref(), &source.extras)?;
        xml.push_str("</p:nvPicPr>");

        if let Some(raw) = source.blip_fill.get(&(self.r_embed.clone(), self.crop)) {
            push_raw(xml, raw)?;
        } else {
            xml.push_str("<p:blipFill>");
            write!(xml, r#"<a:blip r:embed="{}"/>"#, self.r_embed)?;
            if let Some(crop) = self.crop {
                write!(
                    xml,
                    r#"<a:srcRect l="{}" t="{}" r="{}" b="{}"/>"#,
                    crop.left, crop.top, crop.right, crop.bottom
                )?;
            }
            xml.push_str("<a:stretch><a:fillRect/></a:stretch></p:blipFill>");
        }

        xml.push_str("<p:spPr>");
        if let Some(position) = self.position {
            position.write_oriented_xfrm(xml, "a:xfrm", self.orientation)?;
        }
        // Decoded pictures without geometry stay without
        match source.geometry.raw() {
            Some(raw) => push_raw(xml, raw)?,
            None if source.blip_fill.is_empty() => xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#),
            None => {},
        }
        write_retained(xml, &source.extras.sp_pr)?;
        xml.push_str("</p:spPr>");
        write_retained(xml, &source.extras.style)?;
        write_retained(xml, &source.extras.tail)?;
        xml.push_str("</p:pic>");
        Ok(())
    }
}

/// Image relationship and crop of a captured `p:blipFill`.
fn read_blip_fill(raw: &[u8]) -> Result<(String, Option<Crop>)> {
    let mut reader = xml_reader(raw);
    let mut depth = 0usize;
    let mut r_embed = String::new();
    let mut crop = None;
    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if depth == 1 {
                    match e.local_name().as_ref() {
                        b"blip" => r_embed = attr_prefixed(e, b"embed")?.unwrap_or_default(),
                        b"srcRect" => {
                            let inset = |key: &[u8]| {
                                attr_i64(e, key)
                                    .and_then(|v| i32::try_from(v).ok())
                                    .unwrap_or(0)
                            };
                            let rect = Crop {
                                left: inset(b"l"),
                                top: inset(b"t"),
                                right: inset(b"r"),
                                bottom: inset(b"b"),
                            };
                            crop = (!rect.is_zero()).then_some(rect);
                        },
                        _ => {},
                    }
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            },
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => return Ok((r_embed, crop)),
            _ => {},
        }
    }
}
