/// The shape tree (`p:spTree`) of a slide, layout or master.
///
/// List order is z-order, back to front. Shape ids come from a per-tree
/// counter that starts at 2 (1 is the tree's own group id) and never goes
/// backwards, so an id is never handed out twice even after deletion.
///
/// Children without a model (group shapes, connectors, content parts,
/// diagram frames) stay in the list as source bytes at their original
/// position. Modelled shapes that were not changed are written back as they
/// were read.
use crate::common::xml::{
    ElementPath, Retained, attr_i64, attr_prefixed, attr_u32, attr_value, capture_element, push_raw,
};
use crate::ooxml::error::{OoxmlError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;

use super::autoshape::Shape;
use super::base::{Claim, CommonProps, ShapeKind, xml_flag};
use super::chart::Chart;
use super::picture::Picture;
use super::table::{DEFAULT_ROW_HEIGHT, Table, TableCell};
use super::textframe::TextBody;

const FIRST_SHAPE_ID: u32 = 2;

const DEFAULT_HEADER: &str = concat!(
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
);

/// One child of the tree, in document order.
#[derive(Debug, Clone, PartialEq)]
enum Child {
    Modeled {
        shape: ShapeKind,
        /// The shape as decoded, with its source bytes
        source: Retained<ShapeKind>,
    },
    Opaque {
        /// Every `cNvPr` id inside, the child's own id first
        ids: Vec<u32>,
        xml: Vec<u8>,
    },
}

impl Child {
    /// Id z-order operations address the child by.
    fn id(&self) -> Option<u32> {
        match self {
            Child::Modeled { shape, .. } => Some(shape.id()),
            Child::Opaque { ids, .. } => ids.first().copied(),
        }
    }

    fn uses_id(&self, id: u32) -> bool {
        match self {
            Child::Modeled { shape, .. } => shape.id() == id,
            Child::Opaque { ids, .. } => ids.contains(&id),
        }
    }

    fn shape(&self) -> Option<&ShapeKind> {
        match self {
            Child::Modeled { shape, .. } => Some(shape),
            Child::Opaque { .. } => None,
        }
    }

    fn shape_mut(&mut self) -> Option<&mut ShapeKind> {
        match self {
            Child::Modeled { shape, .. } => Some(shape),
            Child::Opaque { .. } => None,
        }
    }
}

/// Ordered collection of shapes.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::shapes::{Position, Shape, ShapeKind, ShapeTree};
///
/// let mut tree = ShapeTree::new();
/// let a = tree.add_shape(ShapeKind::Shape(Shape::text_box("a", Position::default())));
/// let b = tree.add_shape(ShapeKind::Shape(Shape::text_box("b", Position::default())));
/// assert_eq!((a, b), (2, 3));
///
/// tree.send_to_back(b).unwrap();
/// assert_eq!(tree.get_shape_order(), vec![b, a]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTree {
    children: Vec<Child>,
    next_id: u32,
    /// `p:nvGrpSpPr` and `p:grpSpPr` of the tree itself
    header: Retained,
    /// `p:extLst`, which has to stay last
    tail: Retained,
}

impl Default for ShapeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeTree {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            next_id: FIRST_SHAPE_ID,
            header: Retained::default(),
            tail: Retained::default(),
        }
    }

    /// Add a shape on top of the z-order and return its id.
    ///
    /// An id of 0 is replaced by the next counter value. A preset id is kept
    /// and the counter moves past it, unless a child of the tree already uses
    /// it, in which case a fresh id is assigned.
    pub fn add_shape(&mut self, mut shape: ShapeKind) -> u32 {
        let requested = shape.id();
        let id = if requested == 0 || self.id_in_use(requested) {
            self.fresh_id()
        } else {
            if requested >= self.next_id {
                self.next_id = requested.saturating_add(1);
            }
            requested
        };
        shape.set_id(id);
        self.children.push(Child::Modeled {
            shape,
            source: Retained::default(),
        });
        id
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Remove the child with this id, modelled or not. The id counter is not rewound.
    pub fn remove_shape(&mut self, id: u32) -> bool {
        match self.index_of(id) {
            Some(pos) => {
                self.children.remove(pos);
                true
            },
            None => false,
        }
    }

    /// Id the next auto-assigned shape will get.
    #[inline]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Modelled shapes in z-order.
    #[inline]
    pub fn shapes(&self) -> impl Iterator<Item = &ShapeKind> {
        self.children.iter().filter_map(Child::shape)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ShapeKind> {
        self.shapes()
    }

    /// Number of modelled shapes.
    #[inline]
    pub fn len(&self) -> usize {
        self.shapes().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shapes().next().is_none()
    }

    /// Number of children without a model, such as groups and connectors.
    pub fn unmodeled_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| matches!(c, Child::Opaque { .. }))
            .count()
    }

    /// True if any child, or any shape nested in a group, uses this id.
    pub fn contains(&self, id: u32) -> bool {
        self.id_in_use(id)
    }

    fn id_in_use(&self, id: u32) -> bool {
        self.children.iter().any(|c| c.uses_id(id))
    }

    pub fn get_shape_by_id(&self, id: u32) -> Option<&ShapeKind> {
        self.shapes().find(|s| s.id() == id)
    }

    pub fn get_shape_by_id_mut(&mut self, id: u32) -> Option<&mut ShapeKind> {
        self.children
            .iter_mut()
            .filter_map(Child::shape_mut)
            .find(|s| s.id() == id)
    }

    pub fn get_shape_by_name(&self, name: &str) -> Option<&ShapeKind> {
        self.shapes().find(|s| s.name() == name)
    }

    /// All placeholder-bearing shapes in z-order.
    pub fn get_placeholders(&self) -> Vec<&ShapeKind> {
        self.shapes().filter(|s| s.is_placeholder()).collect()
    }

    /// First placeholder matching the given type and/or idx.
    ///
    /// With both filters, both must match; with one, only that one is
    /// checked; with neither, the first placeholder is returned.
    pub fn get_placeholder(&self, ph_type: Option<&str>, idx: Option<u32>) -> Option<&ShapeKind> {
        self.shapes().find(|s| placeholder_matches(s, ph_type, idx))
    }

    pub fn get_placeholder_mut(&mut self, ph_type: Option<&str>, idx: Option<u32>) -> Option<&mut ShapeKind> {
        self.children
            .iter_mut()
            .filter_map(Child::shape_mut)
            .find(|s| placeholder_matches(s, ph_type, idx))
    }

    fn index_of(&self, id: u32) -> Option<usize> {
        self.children.iter().position(|c| c.id() == Some(id))
    }

    fn require(&self, id: u32) -> Result<usize> {
        self.index_of(id).ok_or(OoxmlError::ShapeNotFound(id))
    }

    /// Ids of the tree's children back to front.
    ///
    /// Unmodelled children appear under their own id; one without any id
    /// (never the case in files PowerPoint writes) is left out.
    pub fn get_shape_order(&self) -> Vec<u32> {
        self.children.iter().filter_map(Child::id).collect()
    }

    /// Move a shape to the top of the z-order.
    pub fn bring_to_front(&mut self, id: u32) -> Result<()> {
        let pos = self.require(id)?;
        let child = self.children.remove(pos);
        self.children.push(child);
        Ok(())
    }

    /// Move a shape to the bottom of the z-order.
    pub fn send_to_back(&mut self, id: u32) -> Result<()> {
        let pos = self.require(id)?;
        let child = self.children.remove(pos);
        self.children.insert(0, child);
        Ok(())
    }

    /// Move a shape one step toward the front.
    pub fn bring_forward(&mut self, id: u32) -> Result<()> {
        let pos = self.require(id)?;
        if pos + 1 < self.children.len() {
            self.children.swap(pos, pos + 1);
        }
        Ok(())
    }

    /// Move a shape one step toward the back.
    pub fn send_backward(&mut self, id: u32) -> Result<()> {
        let pos = self.require(id)?;
        if pos > 0 {
            self.children.swap(pos, pos - 1);
        }
        Ok(())
    }

    /// Make `ids` the frontmost children, in the given order.
    ///
    /// Children not listed keep their relative order behind them. Unknown ids
    /// fail with [`OoxmlError::ShapeNotFound`] before anything moves.
    pub fn set_shape_order(&mut self, ids: &[u32]) -> Result<()> {
        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids {
            self.require(id)?;
            if !seen.insert(id) {
                return Err(OoxmlError::InvalidInput(format!(
                    "shape {} listed twice in z-order",
                    id
                )));
            }
        }

        let (mut listed, rest): (Vec<Child>, Vec<Child>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.id().is_some_and(|id| seen.contains(&id)));
        listed.sort_by_key(|c| ids.iter().position(|&id| Some(id) == c.id()));

        self.children = rest;
        self.children.extend(listed);
        Ok(())
    }

    /// Decode a `p:spTree`; the reader is positioned after its start tag and
    /// `xml` is the whole document the reader walks.
    pub(crate) fn parse(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<Self> {
        let mut tree = ShapeTree::new();
        let mut max_id = 1u32;

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    let mut ids = Vec::new();
                    let shape = match local.as_ref() {
                        b"nvGrpSpPr" | b"grpSpPr" => {
                            tree.header.extend(&capture_element(reader, xml, start, e, opened)?);
                            continue;
                        },
                        b"extLst" => {
                            tree.tail.extend(&capture_element(reader, xml, start, e, opened)?);
                            continue;
                        },
                        b"sp" if opened => Some(ShapeKind::Shape(Shape::parse(reader, xml)?)),
                        b"pic" if opened => Some(ShapeKind::Picture(Picture::parse(reader, xml)?)),
                        b"graphicFrame" if opened => {
                            let (frame, id) = parse_graphic_frame(reader, xml)?;
                            ids.push(id);
                            frame
                        },
                        other => {
                            tracing::debug!(
                                element = %String::from_utf8_lossy(other),
                                "keeping unsupported shape element as is"
                            );
                            if opened {
                                ids = nested_ids(reader)?;
                            }
                            None
                        },
                    };

                    let raw = xml[start..reader.buffer_position() as usize].to_vec();
                    let child = match shape {
                        Some(shape) => {
                            max_id = max_id.max(shape.id());
                            Child::Modeled {
                                source: Retained::new(shape.clone(), raw),
                                shape,
                            }
                        },
                        None => {
                            max_id = max_id.max(ids.iter().copied().max().unwrap_or(0));
                            Child::Opaque { ids, xml: raw }
                        },
                    };
                    tree.children.push(child);
                },
                Event::End(_) => break,
                Event::Eof => return Err(OoxmlError::Xml("unexpected end of p:spTree".to_string())),
                _ => {},
            }
        }

        tree.next_id = max_id.saturating_add(1).max(FIRST_SHAPE_ID);
        Ok(tree)
    }

    pub(crate) fn write_xml(&self, xml: &mut String) -> Result<()> {
        xml.push_str("<p:spTree>");
        match self.header.raw() {
            Some(raw) => push_raw(xml, raw)?,
            None => xml.push_str(DEFAULT_HEADER),
        }
        for child in &self.children {
            match child {
                Child::Modeled { shape, source } => match source.get(shape) {
                    Some(raw) => push_raw(xml, raw)?,
                    None => shape.write_xml(xml)?,
                },
                Child::Opaque { xml: raw, .. } => push_raw(xml, raw)?,
            }
        }
        if let Some(raw) = self.tail.raw() {
            push_raw(xml, raw)?;
        }
        xml.push_str("</p:spTree>");
        Ok(())
    }
}

fn placeholder_matches(shape: &ShapeKind, ph_type: Option<&str>, idx: Option<u32>) -> bool {
    match shape.placeholder() {
        Some(ph) => {
            let type_ok = ph_type.is_none_or(|t| ph.ph_type == t);
            let idx_ok = idx.is_none_or(|i| ph.idx.unwrap_or(0) == i);
            type_ok && idx_ok
        },
        None => false,
    }
}

/// Decode a `p:graphicFrame` into a table or chart, or `None` for anything
/// else, together with the frame's `cNvPr` id.
fn parse_graphic_frame(reader: &mut Reader<&[u8]>, xml: &[u8]) -> Result<(Option<ShapeKind>, u32)> {
    let mut common = CommonProps::default();
    let mut path = ElementPath::new();
    let mut table: Option<Table> = None;
    let mut chart_rid: Option<String> = None;
    let mut graphic_uri = String::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let opened = matches!(event, Event::Start(_));
                let local = e.local_name();
                let name = local.as_ref();

                if name == b"txBody" && path.ends_with(&[b"tr", b"tc"]) {
                    let body = if opened {
                        TextBody::parse(reader, xml)?
                    } else {
                        TextBody::new()
                    };
                    if let Some(cell) = table
                        .as_mut()
                        .and_then(|t| t.rows.last_mut())
                        .and_then(|row| row.last_mut())
                    {
                        cell.text = body.text();
                    }
                    continue;
                }

                match common.read(reader, xml, start, e, opened, &path)? {
                    Claim::Element => continue,
                    Claim::Attributes => {},
                    Claim::Unclaimed => match name {
                        b"graphicData" => graphic_uri = attr_value(e, b"uri")?.unwrap_or_default(),
                        b"tbl" if path.ends_with(&[b"graphicData"]) => {
                            table = Some(Table {
                                name: String::new(),
                                ..Default::default()
                            });
                        },
                        b"tblPr" => {
                            if let Some(t) = table.as_mut() {
                                t.first_row = xml_flag(e, b"firstRow")?;
                                t.band_row = xml_flag(e, b"bandRow")?;
                            }
                        },
                        b"gridCol" => {
                            if let Some(t) = table.as_mut() {
                                t.col_widths.push(attr_i64(e, b"w").unwrap_or(0));
                            }
                        },
                        b"tr" if path.ends_with(&[b"tbl"]) => {
                            if let Some(t) = table.as_mut() {
                                t.rows.push(Vec::new());
                                t.row_heights
                                    .push(attr_i64(e, b"h").unwrap_or(DEFAULT_ROW_HEIGHT));
                            }
                        },
                        b"tc" if path.ends_with(&[b"tr"]) => {
                            if let Some(row) = table.as_mut().and_then(|t| t.rows.last_mut()) {
                                row.push(TableCell {
                                    text: String::new(),
                                    row_span: attr_u32(e, b"rowSpan").unwrap_or(1),
                                    col_span: attr_u32(e, b"gridSpan").unwrap_or(1),
                                    h_merge: xml_flag(e, b"hMerge")?,
                                    v_merge: xml_flag(e, b"vMerge")?,
                                });
                            }
                        },
                        b"chart" if path.ends_with(&[b"graphicData"]) => {
                            chart_rid = attr_prefixed(e, b"id")?;
                        },
                        _ => {},
                    },
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
            Event::Eof => {
                return Err(OoxmlError::Xml("unexpected end of p:graphicFrame".to_string()));
            },
            _ => {},
        }
    }

    let id = common.id;
    let position = common.position.unwrap_or_default();
    if let Some(mut table) = table {
        table.id = id;
        table.name = common.name;
        table.position = position;
        table.placeholder = common.placeholder;
        return Ok((Some(ShapeKind::Table(table)), id));
    }
    if let Some(r_id) = chart_rid {
        let chart = Chart {
            id,
            name: common.name,
            position,
            r_id,
            placeholder: common.placeholder,
        };
        return Ok((Some(ShapeKind::Chart(chart)), id));
    }

    tracing::debug!(uri = %graphic_uri, "keeping unsupported graphic frame as is");
    Ok((None, id))
}

/// Consume the rest of an element whose start tag was just read.
///
/// Returns every `cNvPr` id found inside, in document order.
fn nested_ids(reader: &mut Reader<&[u8]>) -> Result<Vec<u32>> {
    let mut depth = 0usize;
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                if e.local_name().as_ref() == b"cNvPr"
                    && let Some(id) = attr_u32(e, b"id")
                {
                    ids.push(id);
                }
                depth += 1;
            },
            Event::Empty(ref e) => {
                if e.local_name().as_ref() == b"cNvPr"
                    && let Some(id) = attr_u32(e, b"id")
                {
                    ids.push(id);
                }
            },
            Event::End(_) => {
                if depth == 0 {
                    return Ok(ids);
                }
                depth -= 1;
            },
            Event::Eof => return Err(OoxmlError::Xml("unexpected end of document".to_string())),
            _ => {},
        }
    }
}
