/// A snapshot view of one slide.
///
/// [`Slide`] owns a copy of the slide's shape tree. Reads never touch the
/// package; changes only reach it through
/// [`Presentation::with_slide_mut`](super::Presentation::with_slide_mut).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::pptx::shapes::{Position, Shape, ShapeKind, ShapeTree, Table};

/// A slide in a presentation.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::Presentation;
///
/// let mut pres = Presentation::new()?;
/// pres.add_slide("Title Slide", None)?;
/// pres.with_slide_mut(1, |slide| slide.set_placeholder_text("title", "Roadmap"))?;
///
/// let slide = pres.get_slide(1)?;
/// assert_eq!(slide.get_title().as_deref(), Some("Roadmap"));
/// # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    number: usize,
    part_name: String,
    layout_part_name: Option<String>,
    tree: ShapeTree,
}

/// Content of one placeholder in a [`SlideDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceholderContent {
    Text(String),
    Lines(Vec<String>),
}

/// A shape that is not a placeholder, as listed by [`Slide::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDescription {
    TextBox { id: u32, name: String, text: String },
    Shape { id: u32, name: String, text: String },
    Image { id: u32, name: String },
    Table { id: u32, name: String, rows: usize, cols: usize },
    Chart { id: u32, name: String },
}

/// Structured summary of a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideDescription {
    pub slide_number: usize,
    pub placeholders: BTreeMap<String, PlaceholderContent>,
    pub shapes: Vec<ShapeDescription>,
}

impl Slide {
    pub(crate) fn new(number: usize, part_name: String, layout_part_name: Option<String>, tree: ShapeTree) -> Self {
        Self {
            number,
            part_name,
            layout_part_name,
            tree,
        }
    }

    /// 1-based position in the presentation.
    #[inline]
    pub fn number(&self) -> usize {
        self.number
    }

    #[inline]
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    #[inline]
    pub fn layout_part_name(&self) -> Option<&str> {
        self.layout_part_name.as_deref()
    }

    #[inline]
    pub fn tree(&self) -> &ShapeTree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut ShapeTree {
        &mut self.tree
    }

    pub(crate) fn into_tree(self) -> ShapeTree {
        self.tree
    }

    /// Placeholders keyed by `type` or `type_idx`; the first shape with a key wins.
    pub fn get_placeholders(&self) -> BTreeMap<String, &ShapeKind> {
        let mut map = BTreeMap::new();
        for shape in self.tree.iter() {
            if let Some(ph) = shape.placeholder() {
                map.entry(ph.key()).or_insert(shape);
            }
        }
        map
    }

    /// Distinct placeholder types in z-order.
    pub fn get_placeholder_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for shape in self.tree.iter() {
            if let Some(ph) = shape.placeholder()
                && !types.contains(&ph.ph_type)
            {
                types.push(ph.ph_type.clone());
            }
        }
        types
    }

    /// Look up a placeholder by a friendly name.
    ///
    /// Accepts placeholder types (`title`, `body`, `dt`, …), the aliases
    /// `content`/`text`/`bullets` (body), `subtitle`/`sub_title` (subTitle) and
    /// `center_title`/`ctrtitle` (ctrTitle), each optionally followed by
    /// `_<idx>`. When no shape has the requested idx, the first placeholder of
    /// the type is returned.
    pub fn find_placeholder(&self, name: &str) -> Result<&ShapeKind> {
        let id = self.placeholder_id(name)?;
        self.tree.get_shape_by_id(id).ok_or(OoxmlError::ShapeNotFound(id))
    }

    pub fn find_placeholder_mut(&mut self, name: &str) -> Result<&mut ShapeKind> {
        let id = self.placeholder_id(name)?;
        self.tree
            .get_shape_by_id_mut(id)
            .ok_or(OoxmlError::ShapeNotFound(id))
    }

    fn placeholder_id(&self, name: &str) -> Result<u32> {
        let (ph_type, idx) = resolve_placeholder_name(name);
        let candidates: Vec<&ShapeKind> = self
            .tree
            .iter()
            .filter(|shape| {
                shape
                    .placeholder()
                    .is_some_and(|ph| ph.ph_type.eq_ignore_ascii_case(&ph_type))
            })
            .collect();

        let by_idx = idx.and_then(|idx| {
            candidates
                .iter()
                .find(|s| s.placeholder().is_some_and(|ph| ph.idx.unwrap_or(0) == idx))
        });
        by_idx
            .or_else(|| candidates.first())
            .map(|shape| shape.id())
            .ok_or_else(|| OoxmlError::PlaceholderNotFound {
                name: name.to_string(),
                slide: self.number,
                available: self.get_placeholders().into_keys().collect(),
            })
    }

    /// Text of the title (or centered title) placeholder.
    pub fn get_title(&self) -> Option<String> {
        self.tree
            .get_placeholder(Some("title"), None)
            .or_else(|| self.tree.get_placeholder(Some("ctrTitle"), None))
            .and_then(ShapeKind::text)
    }

    /// Text of the first body placeholder.
    pub fn get_body(&self) -> Option<String> {
        self.tree
            .get_placeholder(Some("body"), None)
            .and_then(ShapeKind::text)
    }

    /// Replace the text of a placeholder found by [`find_placeholder`](Self::find_placeholder).
    pub fn set_placeholder_text(&mut self, name: &str, text: &str) -> Result<()> {
        match self.find_placeholder_mut(name)? {
            ShapeKind::Shape(shape) => {
                shape.set_text(text);
                Ok(())
            },
            other => Err(OoxmlError::InvalidInput(format!(
                "placeholder '{}' ({}) does not hold text",
                name,
                other.name()
            ))),
        }
    }

    /// Add a text box on top of the slide and return its id.
    pub fn add_text_box(&mut self, text: &str, position: Position) -> u32 {
        let id = self.tree.add_shape(ShapeKind::Shape(Shape::text_box(text, position)));
        if let Some(shape) = self.tree.get_shape_by_id_mut(id).and_then(ShapeKind::as_shape_mut) {
            shape.name = format!("TextBox {}", id - 1);
        }
        id
    }

    /// Add a table filled from row-major data and return its id.
    pub fn add_table(&mut self, data: &[Vec<String>], position: Position) -> Result<u32> {
        let table = Table::from_data(data, position)?;
        let id = self.tree.add_shape(ShapeKind::Table(table));
        if let Some(table) = self.tree.get_shape_by_id_mut(id).and_then(ShapeKind::as_table_mut) {
            table.name = format!("Table {}", id - 1);
        }
        Ok(id)
    }

    pub fn bring_to_front(&mut self, id: u32) -> Result<()> {
        self.tree.bring_to_front(id)
    }

    pub fn send_to_back(&mut self, id: u32) -> Result<()> {
        self.tree.send_to_back(id)
    }

    pub fn bring_forward(&mut self, id: u32) -> Result<()> {
        self.tree.bring_forward(id)
    }

    pub fn send_backward(&mut self, id: u32) -> Result<()> {
        self.tree.send_backward(id)
    }

    pub fn set_shape_order(&mut self, ids: &[u32]) -> Result<()> {
        self.tree.set_shape_order(ids)
    }

    /// Summarize placeholders and other shapes.
    ///
    /// Multi-line placeholder text is reported as a list of lines.
    pub fn describe(&self) -> SlideDescription {
        let mut placeholders = BTreeMap::new();
        for (key, shape) in self.get_placeholders() {
            let text = shape.text().unwrap_or_default();
            let content = if text.contains('\n') {
                PlaceholderContent::Lines(text.split('\n').map(str::to_string).collect())
            } else {
                PlaceholderContent::Text(text)
            };
            placeholders.insert(key, content);
        }

        let shapes = self
            .tree
            .iter()
            .filter(|s| !s.is_placeholder())
            .map(|s| {
                let id = s.id();
                let name = s.name().to_string();
                match s {
                    ShapeKind::Shape(shape) if shape.is_text_box => ShapeDescription::TextBox {
                        id,
                        name,
                        text: shape.text(),
                    },
                    ShapeKind::Shape(shape) => ShapeDescription::Shape {
                        id,
                        name,
                        text: shape.text(),
                    },
                    ShapeKind::Picture(_) => ShapeDescription::Image { id, name },
                    ShapeKind::Table(table) => ShapeDescription::Table {
                        id,
                        name,
                        rows: table.row_count(),
                        cols: table.col_count(),
                    },
                    ShapeKind::Chart(_) => ShapeDescription::Chart { id, name },
                }
            })
            .collect();

        SlideDescription {
            slide_number: self.number,
            placeholders,
            shapes,
        }
    }
}

/// Map a friendly placeholder name to `(type, idx)`.
fn resolve_placeholder_name(name: &str) -> (String, Option<u32>) {
    let trimmed = name.trim();
    let (base, idx) = match trimmed.rsplit_once('_') {
        Some((base, digits)) if !base.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            (base, digits.parse::<u32>().ok())
        },
        _ => (trimmed, None),
    };
    let ph_type = match base.to_ascii_lowercase().as_str() {
        "content" | "text" | "bullets" | "body" => "body".to_string(),
        "subtitle" | "sub_title" => "subTitle".to_string(),
        "center_title" | "ctrtitle" => "ctrTitle".to_string(),
        _ => base.to_string(),
    };
    (ph_type, idx)
}
