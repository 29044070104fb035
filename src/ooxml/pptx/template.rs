//! Template analysis.
//!
//! Reads a presentation package and summarizes what a generator needs to fill
//! it: the layouts with their placeholder slots, the theme palette and fonts,
//! and the slide size. Analysis never modifies the package.
//!
//! ```rust
//! use slidekit::ooxml::pptx::{Presentation, template::{LayoutKind, Template}};
//!
//! let pres = Presentation::new()?;
//! let template = Template::from_package(pres.package())?;
//! assert_eq!(template.recommend_layout(LayoutKind::TwoContent), vec![3]);
//! assert_eq!(template.colors()["accent1"], "#4472C4");
//! # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::unit::emu_to_inches;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::Package;
use crate::ooxml::pptx::parts::layout::normalize_layout_name;
use crate::ooxml::pptx::parts::{
    PlaceholderInfo, PresentationPart, ThemeFonts, ThemePart, XmlPart, get_layout_info_list, theme_part_name,
};

/// The built-in PowerPoint layouts a layout name can be classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    TitleSlide,
    TitleAndContent,
    SectionHeader,
    TwoContent,
    Comparison,
    TitleOnly,
    Blank,
    ContentWithCaption,
    PictureWithCaption,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 9] = [
        LayoutKind::TitleSlide,
        LayoutKind::TitleAndContent,
        LayoutKind::SectionHeader,
        LayoutKind::TwoContent,
        LayoutKind::Comparison,
        LayoutKind::TitleOnly,
        LayoutKind::Blank,
        LayoutKind::ContentWithCaption,
        LayoutKind::PictureWithCaption,
    ];

    /// Normalized layout name, e.g. `title and content`.
    pub fn canonical_name(self) -> &'static str {
        match self {
            LayoutKind::TitleSlide => "title slide",
            LayoutKind::TitleAndContent => "title and content",
            LayoutKind::SectionHeader => "section header",
            LayoutKind::TwoContent => "two content",
            LayoutKind::Comparison => "comparison",
            LayoutKind::TitleOnly => "title only",
            LayoutKind::Blank => "blank",
            LayoutKind::ContentWithCaption => "content with caption",
            LayoutKind::PictureWithCaption => "picture with caption",
        }
    }

    /// Classify a layout name; `None` for custom layouts.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_layout_name(name);
        Self::ALL
            .into_iter()
            .find(|kind| kind.canonical_name() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutAnalysis {
    pub index: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LayoutKind>,
    pub is_custom: bool,
    /// Keyed by `type`, or `type_idx` for a nonzero idx
    pub placeholders: BTreeMap<String, PlaceholderInfo>,
}

/// Everything a generator needs to know about a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAnalysis {
    pub layouts: Vec<LayoutAnalysis>,
    /// `#RRGGBB` by color slot
    pub colors: BTreeMap<String, String>,
    pub fonts: ThemeFonts,
    pub slide_width: i64,
    pub slide_height: i64,
    pub slide_width_inches: f64,
    pub slide_height_inches: f64,
}

impl TemplateAnalysis {
    /// Analyze the presentation in `package`.
    pub fn analyze(package: &Package) -> Result<Self> {
        let main_part = package
            .main_document_part()
            .map_err(|e| OoxmlError::InvalidTemplate(format!("no presentation part: {}", e)))?;
        let (slide_width, slide_height) = PresentationPart::load(package, &main_part)?.get_slide_size();

        let (colors, fonts) = match theme_part_name(package, &main_part) {
            Some(name) => {
                let theme = ThemePart::load(package, &name)?;
                (theme.colors_hex(), theme.fonts().clone())
            },
            None => {
                tracing::debug!(main_part = %main_part, "template has no theme");
                (BTreeMap::new(), ThemeFonts::default())
            },
        };

        let layouts = get_layout_info_list(package)?
            .into_iter()
            .map(|info| {
                let mut placeholders = BTreeMap::new();
                for ph in info.placeholders {
                    placeholders.entry(ph.key.clone()).or_insert(ph);
                }
                let kind = LayoutKind::from_name(&info.name);
                LayoutAnalysis {
                    index: info.index,
                    name: info.name,
                    layout_type: info.layout_type,
                    kind,
                    is_custom: kind.is_none(),
                    placeholders,
                }
            })
            .collect();

        Ok(Self {
            layouts,
            colors,
            fonts,
            slide_width,
            slide_height,
            slide_width_inches: emu_to_inches(slide_width),
            slide_height_inches: emu_to_inches(slide_height),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OoxmlError::InvalidInput(format!("Failed to serialize template schema: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OoxmlError::InvalidInput(format!("Invalid template schema: {}", e)))
    }

    /// Write the analysis as pretty JSON.
    pub fn export_template_schema<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_template_schema<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// One line of [`Template::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSummary {
    pub index: usize,
    pub name: String,
    pub kind: Option<LayoutKind>,
    pub placeholders: Vec<String>,
}

/// Read-only view of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    analysis: TemplateAnalysis,
}

impl Template {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(&Package::open_path(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(&Package::open(bytes)?)
    }

    pub fn from_package(package: &Package) -> Result<Self> {
        Ok(Self {
            analysis: TemplateAnalysis::analyze(package)?,
        })
    }

    #[inline]
    pub fn analysis(&self) -> &TemplateAnalysis {
        &self.analysis
    }

    pub fn into_analysis(self) -> TemplateAnalysis {
        self.analysis
    }

    /// Name, index, kind and placeholder keys of every layout.
    pub fn describe(&self) -> Vec<LayoutSummary> {
        self.analysis
            .layouts
            .iter()
            .map(|l| LayoutSummary {
                index: l.index,
                name: l.name.clone(),
                kind: l.kind,
                placeholders: l.placeholders.keys().cloned().collect(),
            })
            .collect()
    }

    #[inline]
    pub fn colors(&self) -> &BTreeMap<String, String> {
        &self.analysis.colors
    }

    #[inline]
    pub fn fonts(&self) -> &ThemeFonts {
        &self.analysis.fonts
    }

    pub fn layout_names(&self) -> Vec<&str> {
        self.analysis
            .layouts
            .iter()
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Layout by name; exact (normalized) match first, then substring.
    pub fn get_layout(&self, name: &str) -> Option<&LayoutAnalysis> {
        let query = normalize_layout_name(name);
        let layouts = &self.analysis.layouts;
        layouts
            .iter()
            .find(|l| normalize_layout_name(&l.name) == query)
            .or_else(|| {
                if query.is_empty() {
                    return None;
                }
                layouts.iter().find(|l| {
                    let candidate = normalize_layout_name(&l.name);
                    !candidate.is_empty() && (candidate.contains(&query) || query.contains(&candidate))
                })
            })
    }

    /// Indices of the layouts classified as `kind`.
    pub fn recommend_layout(&self, kind: LayoutKind) -> Vec<usize> {
        self.analysis
            .layouts
            .iter()
            .filter(|l| l.kind == Some(kind))
            .map(|l| l.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::pptx::config::{LayoutTemplate, PlaceholderTemplate, PresentationConfig, default_layouts};
    use crate::ooxml::pptx::presentation::Presentation;
    use crate::ooxml::pptx::shapes::Position;

    fn custom_template() -> Template {
        let mut layouts = default_layouts();
        layouts.push(LayoutTemplate::new(
            "Quote",
            None,
            vec![
                PlaceholderTemplate::new("body", Some(1), "Quote", Position::new(1, 2, 3, 4)),
                PlaceholderTemplate::new("body", Some(1), "Duplicate", Position::new(5, 6, 7, 8)),
            ],
        ));
        let config = PresentationConfig {
            default_layouts: layouts,
            ..Default::default()
        };
        let pres = Presentation::with_config(config).unwrap();
        Template::from_package(pres.package()).unwrap()
    }

    #[test]
    fn test_layout_kind() {
        assert_eq!(LayoutKind::from_name("Title_Slide"), Some(LayoutKind::TitleSlide));
        assert_eq!(LayoutKind::from_name(" picture-with-caption "), Some(LayoutKind::PictureWithCaption));
        assert_eq!(LayoutKind::from_name("Agenda"), None);
    }

    #[test]
    fn test_analyze_default_presentation() {
        let template = custom_template();
        let analysis = template.analysis();
        assert_eq!(analysis.layouts.len(), 7);
        assert_eq!(analysis.slide_width, 12_192_000);
        assert!((analysis.slide_width_inches - 13.333).abs() < 0.001);
        assert!((analysis.slide_height_inches - 7.5).abs() < 1e-9);
        assert_eq!(analysis.fonts.heading, "Calibri Light");
        assert_eq!(analysis.fonts.body, "Calibri");
        assert_eq!(analysis.colors.len(), 12);

        let two = &analysis.layouts[3];
        assert_eq!(two.kind, Some(LayoutKind::TwoContent));
        assert!(!two.is_custom);
        assert_eq!(
            two.placeholders.keys().collect::<Vec<_>>(),
            ["body_1", "body_2", "title"]
        );
        assert_eq!(two.placeholders["body_2"].bounds.x, 4_648_200);

        let quote = &analysis.layouts[6];
        assert!(quote.is_custom);
        assert_eq!(quote.placeholders.len(), 1);
        assert_eq!(quote.placeholders["body_1"].name, "Quote");
    }

    #[test]
    fn test_template_facade() {
        let template = custom_template();
        assert_eq!(template.layout_names()[6], "Quote");
        assert_eq!(template.get_layout("two_content").unwrap().index, 3);
        assert_eq!(template.get_layout("title slide").unwrap().index, 0);
        assert_eq!(template.get_layout("quo").unwrap().index, 6);
        assert!(template.get_layout("agenda").is_none());

        assert_eq!(template.recommend_layout(LayoutKind::TitleOnly), vec![5]);
        assert!(template.recommend_layout(LayoutKind::Comparison).is_empty());

        let summary = template.describe();
        assert_eq!(summary[0].placeholders, vec!["ctrTitle", "subTitle_1"]);
        assert_eq!(summary[6].kind, None);
    }

    #[test]
    fn test_schema_file_round_trip() {
        let analysis = custom_template().into_analysis();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        analysis.export_template_schema(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"kind\": \"title_and_content\""));
        assert!(json.contains("\"type\": \"ctrTitle\""));
        let loaded = TemplateAnalysis::load_template_schema(&path).unwrap();
        assert_eq!(loaded.layouts, analysis.layouts);
        assert_eq!(loaded.colors, analysis.colors);
        assert_eq!(loaded.fonts, analysis.fonts);
        assert_eq!(loaded.slide_height, analysis.slide_height);
        assert!((loaded.slide_width_inches - analysis.slide_width_inches).abs() < 1e-9);

        assert!(TemplateAnalysis::from_json("{\"layouts\": 3}").is_err());
    }
}
