/// Construction-time configuration for new presentations.
///
/// [`PresentationConfig`] is a plain value: the layouts a new presentation
/// starts with, its slide size and what `add_slide` does when a layout name
/// cannot be resolved. It can be kept in YAML:
///
/// ```yaml
/// slide_width: 9144000
/// slide_height: 6858000
/// layout_fallback: by_type
/// default_layouts:
///   - name: Title Only
///     layout_type: titleOnly
///     placeholders:
///       - ph_type: title
///         name: Title 1
///         position: { x: 457200, y: 274638, cx: 8229600, cy: 1143000 }
/// ```
use serde::{Deserialize, Serialize};

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::pptx::parts::presentation::{DEFAULT_SLIDE_HEIGHT, DEFAULT_SLIDE_WIDTH};
use crate::ooxml::pptx::shapes::{Placeholder, Position, Shape, ShapeKind, ShapeTree};

/// What `add_slide` does with a layout name that matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutFallback {
    /// Fail with `LayoutNotFound`
    #[default]
    Strict,
    /// Use the layout at index 0
    FirstLayout,
    /// Use the first layout declaring `type="obj"`, else index 0
    ByType,
}

/// A placeholder of a generated layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderTemplate {
    pub ph_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idx: Option<u32>,
    pub name: String,
    pub position: Position,
}

impl PlaceholderTemplate {
    pub fn new(ph_type: &str, idx: Option<u32>, name: &str, position: Position) -> Self {
        Self {
            ph_type: ph_type.to_string(),
            idx,
            name: name.to_string(),
            position,
        }
    }
}

/// A layout generated for new presentations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    pub name: String,
    /// `p:sldLayout@type`, e.g. `title`, `obj`, `twoObj`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_type: Option<String>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderTemplate>,
}

impl LayoutTemplate {
    pub fn new(name: &str, layout_type: Option<&str>, placeholders: Vec<PlaceholderTemplate>) -> Self {
        Self {
            name: name.to_string(),
            layout_type: layout_type.map(str::to_string),
            placeholders,
        }
    }

    /// Shape tree holding one empty placeholder shape per entry.
    pub fn to_tree(&self) -> ShapeTree {
        let mut tree = ShapeTree::new();
        for ph in &self.placeholders {
            let mut shape = Shape::new(ph.name.clone(), ph.position);
            shape.placeholder = Some(Placeholder::new(ph.ph_type.clone(), ph.idx));
            shape.text_frame = Some(Default::default());
            tree.add_shape(ShapeKind::Shape(shape));
        }
        tree
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub default_layouts: Vec<LayoutTemplate>,
    /// EMU
    pub slide_width: i64,
    /// EMU
    pub slide_height: i64,
    pub layout_fallback: LayoutFallback,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            default_layouts: default_layouts(),
            slide_width: DEFAULT_SLIDE_WIDTH,
            slide_height: DEFAULT_SLIDE_HEIGHT,
            layout_fallback: LayoutFallback::Strict,
        }
    }
}

impl PresentationConfig {
    /// Parse a YAML document; fields left out take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_saphyr::from_str(yaml)
            .map_err(|e| OoxmlError::InvalidInput(format!("Invalid presentation config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_saphyr::to_string(self)
            .map_err(|e| OoxmlError::InvalidInput(format!("Failed to serialize presentation config to YAML: {}", e)))
    }

    pub fn with_layout_fallback(mut self, fallback: LayoutFallback) -> Self {
        self.layout_fallback = fallback;
        self
    }

    /// Reject sizes a presentation cannot have.
    pub fn validate(&self) -> Result<()> {
        if self.slide_width <= 0 || self.slide_height <= 0 {
            return Err(OoxmlError::InvalidInput(format!(
                "slide size must be positive, got {}x{}",
                self.slide_width, self.slide_height
            )));
        }
        Ok(())
    }
}

/// The six layouts a new presentation starts with.
pub fn default_layouts() -> Vec<LayoutTemplate> {
    let title = || PlaceholderTemplate::new("title", None, "Title", Position::new(457_200, 274_638, 8_229_600, 1_143_000));
    vec![
        LayoutTemplate::new(
            "Title Slide",
            Some("title"),
            vec![
                PlaceholderTemplate::new("ctrTitle", None, "Title", Position::new(685_800, 2_130_425, 7_772_400, 1_470_025)),
                PlaceholderTemplate::new("subTitle", Some(1), "Subtitle", Position::new(1_371_600, 3_886_200, 6_400_800, 1_752_600)),
            ],
        ),
        LayoutTemplate::new(
            "Title and Content",
            Some("obj"),
            vec![
                title(),
                PlaceholderTemplate::new("body", Some(1), "Content Placeholder", Position::new(457_200, 1_600_200, 8_229_600, 4_525_963)),
            ],
        ),
        LayoutTemplate::new(
            "Section Header",
            Some("secHead"),
            vec![PlaceholderTemplate::new("title", None, "Title", Position::new(722_313, 4_406_900, 7_772_400, 1_362_075))],
        ),
        LayoutTemplate::new(
            "Two Content",
            Some("twoObj"),
            vec![
                title(),
                PlaceholderTemplate::new("body", Some(1), "Content Placeholder", Position::new(457_200, 1_600_200, 4_038_600, 4_525_963)),
                PlaceholderTemplate::new("body", Some(2), "Content Placeholder 2", Position::new(4_648_200, 1_600_200, 4_038_600, 4_525_963)),
            ],
        ),
        LayoutTemplate::new("Blank", Some("blank"), Vec::new()),
        LayoutTemplate::new("Title Only", Some("titleOnly"), vec![title()]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PresentationConfig::default();
        let names: Vec<&str> = config.default_layouts.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            ["Title Slide", "Title and Content", "Section Header", "Two Content", "Blank", "Title Only"]
        );
        assert_eq!((config.slide_width, config.slide_height), (12_192_000, 6_858_000));
        assert_eq!(config.layout_fallback, LayoutFallback::Strict);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = PresentationConfig::default().with_layout_fallback(LayoutFallback::ByType);
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("by_type"));
        assert_eq!(PresentationConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = PresentationConfig::from_yaml_str("slide_width: 9144000\nlayout_fallback: first_layout\n").unwrap();
        assert_eq!(config.slide_width, 9_144_000);
        assert_eq!(config.slide_height, DEFAULT_SLIDE_HEIGHT);
        assert_eq!(config.layout_fallback, LayoutFallback::FirstLayout);
        assert_eq!(config.default_layouts.len(), 6);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(PresentationConfig::from_yaml_str("slide_width: -5\n").is_err());
        assert!(PresentationConfig::from_yaml_str("layout_fallback: sometimes\n").is_err());
    }

    #[test]
    fn test_layout_template_tree() {
        let layout = &default_layouts()[3];
        let tree = layout.to_tree();
        assert_eq!(tree.get_placeholders().len(), 3);
        let right = tree.get_placeholder(Some("body"), Some(2)).unwrap();
        assert_eq!(right.position(), Some(Position::new(4_648_200, 1_600_200, 4_038_600, 4_525_963)));
        assert_eq!(right.id(), 4);
    }
}
