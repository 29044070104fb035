/// Slide layout parts and layout resolution.
///
/// Corresponds to `/ppt/slideLayouts/slideLayoutN.xml`. The canonical layout
/// index used across the crate is the position of a layout when all layout
/// parts are sorted by the numeric suffix of their file name, so
/// `slideLayout2.xml` comes before `slideLayout10.xml`.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::master::SlideMasterPart;
use super::{PML_NAMESPACES, SlideDocument, XML_DECLARATION, XmlPart};
use crate::common::xml::escape_xml;
use crate::ooxml::error::Result;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::{Package, PartName};
use crate::ooxml::pptx::shapes::{Position, ShapeKind, ShapeTree};

/// A slide layout: a named set of placeholders a new slide starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideLayoutPart {
    doc: SlideDocument,
}

impl SlideLayoutPart {
    /// A layout with the given name, optional declared type and shapes.
    pub fn new(name: &str, layout_type: Option<&str>, tree: ShapeTree) -> Self {
        let mut prefix = String::with_capacity(256);
        prefix.push_str(XML_DECLARATION);
        prefix.push_str("<p:sldLayout ");
        prefix.push_str(PML_NAMESPACES);
        if let Some(t) = layout_type {
            prefix.push_str(&format!(r#" type="{}""#, escape_xml(t)));
        }
        prefix.push_str(&format!(r#" preserve="1"><p:cSld name="{}">"#, escape_xml(name)));

        let suffix = "</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>".to_string();

        let mut doc = SlideDocument::from_parts(prefix, suffix, tree);
        doc.name = Some(name.to_string());
        doc.root_type = layout_type.map(str::to_string);
        Self { doc }
    }

    /// `p:cSld@name`, if declared.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.doc.name.as_deref()
    }

    /// The `type` attribute of `p:sldLayout` (`title`, `obj`, `twoObj`, …).
    #[inline]
    pub fn layout_type(&self) -> Option<&str> {
        self.doc.root_type.as_deref()
    }

    #[inline]
    pub fn tree(&self) -> &ShapeTree {
        &self.doc.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut ShapeTree {
        &mut self.doc.tree
    }
}

impl XmlPart for SlideLayoutPart {
    const CONTENT_TYPE: &'static str = ct::PML_SLIDE_LAYOUT;

    fn from_xml(xml: &[u8]) -> Result<Self> {
        Ok(Self {
            doc: SlideDocument::parse(xml)?,
        })
    }

    fn to_xml(&self) -> Result<Vec<u8>> {
        self.doc.to_xml()
    }
}

/// A placeholder as seen by layout listings and template analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderInfo {
    /// `type`, or `type_idx` for a nonzero idx
    pub key: String,
    #[serde(rename = "type")]
    pub ph_type: String,
    pub idx: Option<u32>,
    pub name: String,
    pub bounds: Position,
}

impl PlaceholderInfo {
    /// Describe a placeholder shape; `None` for ordinary shapes.
    ///
    /// A shape without its own transform reports zero bounds.
    pub fn from_shape(shape: &ShapeKind) -> Option<Self> {
        let ph = shape.placeholder()?;
        Some(Self {
            key: ph.key(),
            ph_type: ph.ph_type.clone(),
            idx: ph.idx,
            name: shape.name().to_string(),
            bounds: shape.position().unwrap_or_default(),
        })
    }
}

/// Summary of one layout in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub index: usize,
    pub name: String,
    pub part_name: String,
    pub layout_type: Option<String>,
    /// Relationship id from the layout to its master
    pub master_rid: Option<String>,
    pub placeholders: Vec<PlaceholderInfo>,
}

/// Layout part names in canonical order.
pub fn layout_part_names(package: &Package) -> Vec<String> {
    let mut names: Vec<(u32, String)> = package
        .part_names()
        .filter(|name| package.content_type(name) == Some(ct::PML_SLIDE_LAYOUT))
        .map(|name| {
            let idx = PartName::new(name)
                .ok()
                .and_then(|p| p.idx())
                .unwrap_or(u32::MAX);
            (idx, name.to_string())
        })
        .collect();
    names.sort();
    names.into_iter().map(|(_, name)| name).collect()
}

/// Describe every layout in canonical order.
///
/// Placeholders without their own transform take the bounds of the master
/// placeholder they inherit from.
pub fn get_layout_info_list(package: &Package) -> Result<Vec<LayoutInfo>> {
    let mut masters: HashMap<String, SlideMasterPart> = HashMap::new();
    let mut infos = Vec::new();

    for (index, part_name) in layout_part_names(package).into_iter().enumerate() {
        let layout = SlideLayoutPart::load(package, &part_name)?;

        let master_rid = package
            .rels(&part_name)
            .and_then(|rels| rels.with_reltype(rt::SLIDE_MASTER).next())
            .map(|rel| rel.r_id().to_string());

        let master = match master_rid.as_deref() {
            Some(r_id) => {
                let master_name = package.related_part_name(&part_name, r_id)?;
                if !masters.contains_key(&master_name) {
                    let master = SlideMasterPart::load(package, &master_name)?;
                    masters.insert(master_name.clone(), master);
                }
                masters.get(&master_name)
            },
            None => None,
        };

        let placeholders = layout
            .tree()
            .iter()
            .filter_map(|shape| {
                let mut info = PlaceholderInfo::from_shape(shape)?;
                if shape.position().is_none() {
                    if let Some(bounds) = master.and_then(|m| m.inherited_bounds(&info.ph_type)) {
                        info.bounds = bounds;
                    }
                }
                Some(info)
            })
            .collect();

        infos.push(LayoutInfo {
            index,
            name: layout
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Layout {}", index + 1)),
            part_name,
            layout_type: layout.layout_type().map(str::to_string),
            master_rid,
            placeholders,
        });
    }

    Ok(infos)
}

/// Lower-case, `_` and `-` to spaces, trimmed.
pub(crate) fn normalize_layout_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '-'], " ").trim().to_string()
}

/// Pick a layout by name from a canonical list.
///
/// An exact normalized match always wins; with `fuzzy`, the first layout
/// whose normalized name contains the query or is contained in it is taken.
pub fn find_layout_by_name<'a>(layouts: &'a [LayoutInfo], name: &str, fuzzy: bool) -> Option<&'a LayoutInfo> {
    let query = normalize_layout_name(name);
    if let Some(exact) = layouts
        .iter()
        .find(|l| normalize_layout_name(&l.name) == query)
    {
        return Some(exact);
    }
    if !fuzzy || query.is_empty() {
        return None;
    }
    layouts.iter().find(|l| {
        let candidate = normalize_layout_name(&l.name);
        !candidate.is_empty() && (candidate.contains(&query) || query.contains(&candidate))
    })
}

/// Resolve a layout of `package` by name.
pub fn get_layout_by_name(package: &Package, name: &str, fuzzy: bool) -> Result<Option<LayoutInfo>> {
    let layouts = get_layout_info_list(package)?;
    Ok(find_layout_by_name(&layouts, name, fuzzy).cloned())
}

/// Resolve a layout of `package` by canonical index.
pub fn get_layout_by_index(package: &Package, index: usize) -> Result<Option<LayoutInfo>> {
    Ok(get_layout_info_list(package)?.into_iter().nth(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::shapes::{Placeholder, Shape};

    fn info(index: usize, name: &str) -> LayoutInfo {
        LayoutInfo {
            index,
            name: name.to_string(),
            part_name: format!("ppt/slideLayouts/slideLayout{}.xml", index + 1),
            layout_type: None,
            master_rid: None,
            placeholders: Vec::new(),
        }
    }

    fn layout_with_title(name: &str) -> SlideLayoutPart {
        let mut tree = ShapeTree::new();
        let mut title = Shape::new("Title 1", Position::new(1, 2, 3, 4));
        title.placeholder = Some(Placeholder::new("title", None));
        tree.add_shape(ShapeKind::Shape(title));
        SlideLayoutPart::new(name, Some("titleOnly"), tree)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_layout_name("  Two_Content-Wide "), "two content wide");
    }

    #[test]
    fn test_exact_match_beats_substring() {
        let layouts = vec![info(0, "Title Only"), info(1, "Title Slide")];
        assert_eq!(find_layout_by_name(&layouts, "title slide", true).unwrap().index, 1);
        assert_eq!(find_layout_by_name(&layouts, "TITLE_ONLY", false).unwrap().index, 0);
    }

    #[test]
    fn test_fuzzy_substring() {
        let layouts = vec![info(0, "Title Slide"), info(1, "Two Content")];
        assert_eq!(find_layout_by_name(&layouts, "two", true).unwrap().index, 1);
        assert!(find_layout_by_name(&layouts, "two", false).is_none());
        assert!(find_layout_by_name(&layouts, "agenda", true).is_none());
    }

    #[test]
    fn test_layout_xml_round_trip() {
        let layout = layout_with_title("Title & Only");
        let xml = layout.to_xml().unwrap();
        let text = String::from_utf8_lossy(&xml);
        assert!(text.contains(r#"type="titleOnly" preserve="1"><p:cSld name="Title &amp; Only"><p:spTree>"#));

        let again = SlideLayoutPart::from_xml(&xml).unwrap();
        assert_eq!(again.name(), Some("Title & Only"));
        assert_eq!(again.layout_type(), Some("titleOnly"));
        assert_eq!(
            again.tree().get_placeholder(Some("title"), None).unwrap().position(),
            Some(Position::new(1, 2, 3, 4))
        );
    }

    #[test]
    fn test_numeric_layout_order() {
        let mut package = Package::new();
        for n in [10, 2, 1] {
            let layout = layout_with_title(&format!("L{}", n));
            layout
                .store(&mut package, &format!("ppt/slideLayouts/slideLayout{}.xml", n))
                .unwrap();
        }
        assert_eq!(
            layout_part_names(&package),
            vec![
                "ppt/slideLayouts/slideLayout1.xml",
                "ppt/slideLayouts/slideLayout2.xml",
                "ppt/slideLayouts/slideLayout10.xml",
            ]
        );

        let infos = get_layout_info_list(&package).unwrap();
        assert_eq!(infos[2].name, "L10");
        assert_eq!(infos[2].index, 2);
        assert_eq!(infos[0].placeholders[0].key, "title");
        assert_eq!(get_layout_by_index(&package, 1).unwrap().unwrap().name, "L2");
        assert!(get_layout_by_index(&package, 3).unwrap().is_none());
    }

    #[test]
    fn test_unnamed_layout() {
        let xml = br#"<p:sldLayout xmlns:p="p"><p:cSld><p:spTree/></p:cSld></p:sldLayout>"#;
        let mut package = Package::new();
        package
            .set_part("ppt/slideLayouts/slideLayout1.xml", xml.to_vec(), Some(ct::PML_SLIDE_LAYOUT))
            .unwrap();
        let infos = get_layout_info_list(&package).unwrap();
        assert_eq!(infos[0].name, "Layout 1");
        assert!(infos[0].placeholders.is_empty());
    }
}
