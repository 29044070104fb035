/// Base shape types shared by every shape variant.
///
/// [`ShapeKind`] is the closed set of shapes a shape tree holds. Each variant
/// carries its own struct; everything common (id, name, position,
/// placeholder marker) is reachable through the enum.
use crate::common::unit::emu_to_inches;
use crate::common::xml::{
    ElementPath, Retained, attr_i64, attr_u32, attr_value, capture_content, capture_element, escape_xml, push_raw,
};
use crate::ooxml::error::Result;
use quick_xml::Reader;
use quick_xml::events::BytesStart;
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

use super::autoshape::Shape;
use super::chart::Chart;
use super::picture::Picture;
use super::table::Table;

/// Offset and extent of a shape in EMU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Position {
    pub const fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    /// `(x, y, cx, cy)` in inches.
    pub fn to_inches(self) -> (f64, f64, f64, f64) {
        (
            emu_to_inches(self.x),
            emu_to_inches(self.y),
            emu_to_inches(self.cx),
            emu_to_inches(self.cy),
        )
    }

    /// Write an `xfrm` element (`a:xfrm` in `spPr`, `p:xfrm` on graphic frames).
    pub(crate) fn write_xfrm(&self, xml: &mut String, tag: &str) -> Result<()> {
        self.write_oriented_xfrm(xml, tag, Orientation::default())
    }

    pub(crate) fn write_oriented_xfrm(&self, xml: &mut String, tag: &str, orientation: Orientation) -> Result<()> {
        write!(xml, "<{}", tag)?;
        if orientation.rotation != 0 {
            write!(xml, r#" rot="{}""#, orientation.rotation)?;
        }
        if orientation.flip_h {
            xml.push_str(r#" flipH="1""#);
        }
        if orientation.flip_v {
            xml.push_str(r#" flipV="1""#);
        }
        write!(
            xml,
            r#"><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{tag}>"#,
            self.x,
            self.y,
            self.cx,
            self.cy,
            tag = tag
        )?;
        Ok(())
    }
}

/// Rotation and mirroring from the `xfrm` attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    /// Clockwise, in 60000ths of a degree
    pub rotation: i32,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl Orientation {
    fn read(e: &BytesStart<'_>) -> Result<Self> {
        Ok(Self {
            rotation: attr_i64(e, b"rot").and_then(|v| i32::try_from(v).ok()).unwrap_or(0),
            flip_h: xml_flag(e, b"flipH")?,
            flip_v: xml_flag(e, b"flipV")?,
        })
    }
}

/// Placeholder marker (`p:ph`) identifying a shape's role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// `title`, `body`, `subTitle`, `ctrTitle`, `dt`, `ftr`, `sldNum`, `pic`, …
    pub ph_type: String,
    pub idx: Option<u32>,
    /// `full`, `half` or `quarter`
    pub size: Option<String>,
    /// `horz` or `vert`
    pub orient: Option<String>,
    pub has_custom_prompt: bool,
    /// The source left `type` out and `body` was inferred.
    pub(crate) implicit_type: bool,
}

impl Placeholder {
    pub fn new<S: Into<String>>(ph_type: S, idx: Option<u32>) -> Self {
        Self {
            ph_type: ph_type.into(),
            idx,
            size: None,
            orient: None,
            has_custom_prompt: false,
            implicit_type: false,
        }
    }

    /// Decode `p:ph`. A missing `type` means `body`.
    pub(crate) fn from_element(e: &BytesStart<'_>) -> Result<Self> {
        let ph_type = attr_value(e, b"type")?;
        Ok(Self {
            implicit_type: ph_type.is_none(),
            ph_type: ph_type.unwrap_or_else(|| "body".to_string()),
            idx: attr_u32(e, b"idx"),
            size: attr_value(e, b"sz")?,
            orient: attr_value(e, b"orient")?,
            has_custom_prompt: xml_flag(e, b"hasCustomPrompt")?,
        })
    }

    /// Key used by placeholder maps: `type`, or `type_idx` for a nonzero idx.
    pub fn key(&self) -> String {
        match self.idx {
            Some(idx) if idx > 0 => format!("{}_{}", self.ph_type, idx),
            _ => self.ph_type.clone(),
        }
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<p:ph");
        if !(self.implicit_type && self.ph_type == "body") {
            write!(xml, r#" type="{}""#, escape_xml(&self.ph_type))?;
        }
        if let Some(ref orient) = self.orient {
            write!(xml, r#" orient="{}""#, escape_xml(orient))?;
        }
        if let Some(ref size) = self.size {
            write!(xml, r#" sz="{}""#, escape_xml(size))?;
        }
        if let Some(idx) = self.idx {
            write!(xml, r#" idx="{}""#, idx)?;
        }
        if self.has_custom_prompt {
            xml.push_str(r#" hasCustomPrompt="1""#);
        }
        xml.push_str("/>");
        Ok(())
    }
}

/// Source content of a shape element that has no model.
///
/// Written back in place whenever the shape itself has to be regenerated.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ShapeExtras {
    /// `cNvPr` attributes besides id, name and descr, e.g. `hidden`
    pub c_nv_pr_attrs: Retained,
    /// Children of `cNvPr` such as `a:hlinkClick`
    pub c_nv_pr: Retained,
    /// Children of `nvPr` other than `p:ph`
    pub nv_pr: Retained,
    /// Children of `spPr` after the fill: outline, effects, 3-D, extensions
    pub sp_pr: Retained,
    /// `p:style`
    pub style: Retained,
    /// Trailing children such as `p:extLst`
    pub tail: Retained,
}

/// What [`CommonProps::read`] did with an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Not a common element
    Unclaimed,
    /// Attributes were read; the caller keeps walking the element
    Attributes,
    /// The whole element was consumed
    Element,
}

/// Non-visual and transform properties every shape element carries.
///
/// Filled while a shape element is walked; `path` is relative to the shape
/// element itself.
#[derive(Debug, Default)]
pub(crate) struct CommonProps {
    pub id: u32,
    pub name: String,
    pub descr: Option<String>,
    pub placeholder: Option<Placeholder>,
    pub position: Option<Position>,
    pub orientation: Orientation,
    pub extras: ShapeExtras,
}

impl CommonProps {
    /// Record `e` if it is one of the common elements.
    ///
    /// `start` is the offset of `e`'s start tag in `xml`, the document the
    /// reader walks.
    pub fn read(
        &mut self,
        reader: &mut Reader<&[u8]>,
        xml: &[u8],
        start: usize,
        e: &BytesStart<'_>,
        opened: bool,
        path: &ElementPath,
    ) -> Result<Claim> {
        let in_nv_pr = path.depth() == 2 && path.ends_with(&[b"nvPr"]);
        let claim = match e.local_name().as_ref() {
            b"cNvPr" if path.depth() == 1 => {
                self.id = attr_u32(e, b"id").unwrap_or(0);
                self.name = attr_value(e, b"name")?.unwrap_or_default();
                self.descr = attr_value(e, b"descr")?;
                self.extras.c_nv_pr_attrs = other_attributes(e, &[b"id", b"name", b"descr"])?;
                if opened {
                    self.extras.c_nv_pr = Retained::from_raw(capture_content(reader, xml, e)?);
                }
                Claim::Element
            },
            b"ph" if in_nv_pr => {
                self.placeholder = Some(Placeholder::from_element(e)?);
                if opened {
                    reader.read_to_end(e.name())?;
                }
                Claim::Element
            },
            _ if in_nv_pr => {
                self.extras.nv_pr.extend(&capture_element(reader, xml, start, e, opened)?);
                Claim::Element
            },
            b"xfrm" if at_xfrm(path) => {
                self.orientation = Orientation::read(e)?;
                Claim::Attributes
            },
            b"off" if in_xfrm(path) => {
                let pos = self.position.get_or_insert_with(Position::default);
                pos.x = attr_i64(e, b"x").unwrap_or(0);
                pos.y = attr_i64(e, b"y").unwrap_or(0);
                Claim::Attributes
            },
            b"ext" if in_xfrm(path) => {
                let pos = self.position.get_or_insert_with(Position::default);
                pos.cx = attr_i64(e, b"cx").unwrap_or(0);
                pos.cy = attr_i64(e, b"cy").unwrap_or(0);
                Claim::Attributes
            },
            _ => Claim::Unclaimed,
        };
        Ok(claim)
    }
}

/// Where an `xfrm` element itself sits: in `spPr`, or directly under a graphic frame.
fn at_xfrm(path: &ElementPath) -> bool {
    (path.depth() == 1 && path.ends_with(&[b"spPr"])) || path.is_empty()
}

/// `spPr/xfrm` on shapes and pictures, `xfrm` directly under graphic frames.
fn in_xfrm(path: &ElementPath) -> bool {
    (path.depth() == 2 && path.ends_with(&[b"spPr", b"xfrm"]))
        || (path.depth() == 1 && path.ends_with(&[b"xfrm"]))
}

/// Source text of every attribute not in `known`, each with a leading space.
fn other_attributes(e: &BytesStart<'_>, known: &[&[u8]]) -> Result<Retained> {
    let mut raw = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if known.contains(&attr.key.as_ref()) {
            continue;
        }
        let quote = if attr.value.contains(&b'"') { b'\'' } else { b'"' };
        raw.push(b' ');
        raw.extend_from_slice(attr.key.as_ref());
        raw.extend_from_slice(&[b'=', quote]);
        raw.extend_from_slice(&attr.value);
        raw.push(quote);
    }
    Ok(if raw.is_empty() {
        Retained::default()
    } else {
        Retained::from_raw(raw)
    })
}

/// `1`, `true` and `on` are true; anything else, or no attribute, is false.
pub(crate) fn xml_flag(e: &BytesStart<'_>, key: &[u8]) -> Result<bool> {
    Ok(matches!(attr_value(e, key)?.as_deref(), Some("1" | "true" | "on")))
}

/// Write `p:cNvPr`.
pub(crate) fn write_c_nv_pr(
    xml: &mut String,
    id: u32,
    name: &str,
    descr: Option<&str>,
    extras: &ShapeExtras,
) -> Result<()> {
    write!(xml, r#"<p:cNvPr id="{}" name="{}""#, id, escape_xml(name))?;
    if let Some(descr) = descr {
        write!(xml, r#" descr="{}""#, escape_xml(descr))?;
    }
    if let Some(attrs) = extras.c_nv_pr_attrs.raw() {
        push_raw(xml, attrs)?;
    }
    match extras.c_nv_pr.raw() {
        Some(inner) => {
            xml.push('>');
            push_raw(xml, inner)?;
            xml.push_str("</p:cNvPr>");
        },
        None => xml.push_str("/>"),
    }
    Ok(())
}

/// Write `p:nvPr`, with the placeholder marker when present.
pub(crate) fn write_nv_pr(xml: &mut String, placeholder: Option<&Placeholder>, extras: &ShapeExtras) -> Result<()> {
    if placeholder.is_none() && extras.nv_pr.is_empty() {
        xml.push_str("<p:nvPr/>");
        return Ok(());
    }
    xml.push_str("<p:nvPr>");
    if let Some(ph) = placeholder {
        ph.write_xml(xml)?;
    }
    if let Some(raw) = extras.nv_pr.raw() {
        push_raw(xml, raw)?;
    }
    xml.push_str("</p:nvPr>");
    Ok(())
}

/// Write passthrough content if there is any.
pub(crate) fn write_retained(xml: &mut String, retained: &Retained) -> Result<()> {
    if let Some(raw) = retained.raw() {
        push_raw(xml, raw)?;
    }
    Ok(())
}

/// A shape in a shape tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Shape(Shape),
    Picture(Picture),
    Table(Table),
    Chart(Chart),
}

impl ShapeKind {
    pub fn id(&self) -> u32 {
        match self {
            ShapeKind::Shape(s) => s.id,
            ShapeKind::Picture(p) => p.id,
            ShapeKind::Table(t) => t.id,
            ShapeKind::Chart(c) => c.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        match self {
            ShapeKind::Shape(s) => s.id = id,
            ShapeKind::Picture(p) => p.id = id,
            ShapeKind::Table(t) => t.id = id,
            ShapeKind::Chart(c) => c.id = id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ShapeKind::Shape(s) => &s.name,
            ShapeKind::Picture(p) => &p.name,
            ShapeKind::Table(t) => &t.name,
            ShapeKind::Chart(c) => &c.name,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            ShapeKind::Shape(s) => s.position,
            ShapeKind::Picture(p) => p.position,
            ShapeKind::Table(t) => Some(t.position),
            ShapeKind::Chart(c) => Some(c.position),
        }
    }

    pub fn placeholder(&self) -> Option<&Placeholder> {
        match self {
            ShapeKind::Shape(s) => s.placeholder.as_ref(),
            ShapeKind::Picture(p) => p.placeholder.as_ref(),
            ShapeKind::Table(t) => t.placeholder.as_ref(),
            ShapeKind::Chart(c) => c.placeholder.as_ref(),
        }
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.placeholder().is_some()
    }

    /// Text of the shape's text frame, if it has one.
    pub fn text(&self) -> Option<String> {
        match self {
            ShapeKind::Shape(s) => s.text_frame.as_ref().map(|tf| tf.text()),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            ShapeKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_shape_mut(&mut self) -> Option<&mut Shape> {
        match self {
            ShapeKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            ShapeKind::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            ShapeKind::Table(t) => Some(t),
            _ => None,
        }
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        match self {
            ShapeKind::Shape(s) => s.write_xml(xml),
            ShapeKind::Picture(p) => p.write_xml(xml),
            ShapeKind::Table(t) => t.write_xml(xml),
            ShapeKind::Chart(c) => c.write_xml(xml),
        }
    }
}
