/// Theme parts for PowerPoint presentations.
///
/// Corresponds to `/ppt/theme/themeN.xml`. Only the color scheme and the
/// font scheme are modeled; the format scheme is carried through as is.
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

use super::{XML_DECLARATION, XmlPart, element_span};
use crate::common::xml::{ElementPath, attr_value, escape_xml, xml_reader};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::Package;
use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};

/// The twelve color scheme slots, in schema order.
pub const COLOR_SLOTS: [&str; 12] = [
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6", "hlink",
    "folHlink",
];

/// Office palette: slot, system color (if any), RGB.
const OFFICE_COLORS: [(&str, Option<&str>, &str); 12] = [
    ("dk1", Some("windowText"), "000000"),
    ("lt1", Some("window"), "FFFFFF"),
    ("dk2", None, "44546A"),
    ("lt2", None, "E7E6E6"),
    ("accent1", None, "4472C4"),
    ("accent2", None, "ED7D31"),
    ("accent3", None, "A5A5A5"),
    ("accent4", None, "FFC000"),
    ("accent5", None, "5B9BD5"),
    ("accent6", None, "70AD47"),
    ("hlink", None, "0563C1"),
    ("folHlink", None, "954F72"),
];

const OFFICE_MAJOR_FONT: &str = "Calibri Light";
const OFFICE_MINOR_FONT: &str = "Calibri";

const FORMAT_SCHEME: &str = concat!(
    r#"<a:fmtScheme name="Office">"#,
    r#"<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:tint val="50000"/></a:schemeClr></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:shade val="80000"/></a:schemeClr></a:solidFill></a:fillStyleLst>"#,
    r#"<a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>"#,
    r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:tint val="95000"/></a:schemeClr></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"><a:shade val="90000"/></a:schemeClr></a:solidFill></a:bgFillStyleLst>"#,
    "</a:fmtScheme>"
);

/// One color scheme entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeColor {
    /// Slot name (`dk1`, `accent1`, …)
    pub name: String,
    /// Explicit RGB (`a:srgbClr@val`), `RRGGBB`
    pub rgb: Option<String>,
    /// System color (`a:sysClr@val`), e.g. `windowText`
    pub system_color: Option<String>,
    /// Fallback RGB of a system color (`a:sysClr@lastClr`)
    pub last_color: Option<String>,
}

impl ThemeColor {
    /// `#RRGGBB`, from the explicit RGB or a system color's fallback.
    pub fn hex(&self) -> Option<String> {
        self.rgb
            .as_deref()
            .or(self.last_color.as_deref())
            .map(|rgb| format!("#{}", rgb.to_ascii_uppercase()))
    }
}

/// Major (heading) and minor (body) typefaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFonts {
    pub heading: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_east_asian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_complex_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_east_asian: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_complex_script: Option<String>,
}

/// Theme part - defines the visual styling of a presentation.
///
/// # Examples
///
/// ```rust
/// use slidekit::ooxml::pptx::parts::ThemePart;
///
/// let mut theme = ThemePart::office_default();
/// assert_eq!(theme.fonts().heading, "Calibri Light");
///
/// theme.set_color("accent1", "#1f4e79").unwrap();
/// assert_eq!(theme.color("accent1").unwrap().hex().as_deref(), Some("#1F4E79"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ThemePart {
    xml: Vec<u8>,
    name: String,
    colors: Vec<ThemeColor>,
    fonts: ThemeFonts,
}

impl ThemePart {
    /// The Office theme: Office palette, Calibri Light headings, Calibri body.
    pub fn office_default() -> Self {
        let mut xml = String::with_capacity(4096);
        xml.push_str(XML_DECLARATION);
        xml.push_str(r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office">"#);

        let mut colors = Vec::with_capacity(OFFICE_COLORS.len());
        for (slot, system, rgb) in OFFICE_COLORS {
            match system {
                Some(sys) => {
                    let _ = write!(xml, r#"<a:{slot}><a:sysClr val="{sys}" lastClr="{rgb}"/></a:{slot}>"#);
                },
                None => {
                    let _ = write!(xml, r#"<a:{slot}><a:srgbClr val="{rgb}"/></a:{slot}>"#);
                },
            }
            colors.push(ThemeColor {
                name: slot.to_string(),
                rgb: system.is_none().then(|| rgb.to_string()),
                system_color: system.map(str::to_string),
                last_color: system.map(|_| rgb.to_string()),
            });
        }
        xml.push_str("</a:clrScheme>");

        let _ = write!(
            xml,
            concat!(
                r#"<a:fontScheme name="Office">"#,
                r#"<a:majorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
                r#"<a:minorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
                "</a:fontScheme>"
            ),
            OFFICE_MAJOR_FONT, OFFICE_MINOR_FONT
        );
        xml.push_str(FORMAT_SCHEME);
        xml.push_str("</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>");

        Self {
            xml: xml.into_bytes(),
            name: "Office Theme".to_string(),
            colors,
            fonts: ThemeFonts {
                heading: OFFICE_MAJOR_FONT.to_string(),
                body: OFFICE_MINOR_FONT.to_string(),
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color scheme entries in document order.
    #[inline]
    pub fn colors(&self) -> &[ThemeColor] {
        &self.colors
    }

    pub fn color(&self, name: &str) -> Option<&ThemeColor> {
        self.colors.iter().find(|c| c.name == name)
    }

    /// Slot name to `#RRGGBB`, for slots with a resolvable RGB.
    pub fn colors_hex(&self) -> BTreeMap<String, String> {
        self.colors
            .iter()
            .filter_map(|c| c.hex().map(|hex| (c.name.clone(), hex)))
            .collect()
    }

    #[inline]
    pub fn fonts(&self) -> &ThemeFonts {
        &self.fonts
    }

    /// Set one color scheme slot to an explicit RGB (`RRGGBB`, `#` optional).
    pub fn set_color(&mut self, name: &str, rgb: &str) -> Result<()> {
        if !COLOR_SLOTS.contains(&name) {
            return Err(OoxmlError::InvalidInput(format!(
                "'{}' is not a theme color slot (expected one of {})",
                name,
                COLOR_SLOTS.join(", ")
            )));
        }
        let rgb = rgb.trim_start_matches('#').to_ascii_uppercase();
        if rgb.len() != 6 || !rgb.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(OoxmlError::InvalidInput(format!("'{}' is not an RRGGBB color", rgb)));
        }

        let xml = self.xml.as_slice();
        let spliced = match element_span(xml, &[b"clrScheme", name.as_bytes()])? {
            Some(span) => {
                let qname = qualified_name(&xml[span.clone()]);
                let entry = color_entry(&qname, &rgb);
                [&xml[..span.start], entry.as_bytes(), &xml[span.end..]].concat()
            },
            None => {
                let scheme = element_span(xml, &[b"clrScheme"])?
                    .ok_or_else(|| OoxmlError::InvalidInput("theme has no color scheme".to_string()))?;
                let scheme_qname = qualified_name(&xml[scheme.clone()]);
                let close = format!("</{}>", scheme_qname);
                if !xml[scheme.clone()].ends_with(close.as_bytes()) {
                    return Err(OoxmlError::InvalidInput("theme color scheme is empty".to_string()));
                }
                let prefix = scheme_qname
                    .rfind(':')
                    .map(|i| &scheme_qname[..=i])
                    .unwrap_or("");
                let entry = color_entry(&format!("{}{}", prefix, name), &rgb);
                let at = scheme.end - close.len();
                [&xml[..at], entry.as_bytes(), &xml[at..]].concat()
            },
        };

        *self = Self::from_xml(&spliced)?;
        Ok(())
    }
}

/// `<a:accent1><a:srgbClr val="…"/></a:accent1>` with the caller's prefix.
fn color_entry(qname: &str, rgb: &str) -> String {
    let prefix = qname.rfind(':').map(|i| &qname[..=i]).unwrap_or("");
    format!(r#"<{q}><{p}srgbClr val="{rgb}"/></{q}>"#, q = qname, p = prefix, rgb = escape_xml(rgb))
}

/// Tag name at the start of an element's raw bytes.
fn qualified_name(raw: &[u8]) -> String {
    let raw = raw.strip_prefix(b"<").unwrap_or(raw);
    let end = raw
        .iter()
        .position(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/')
        .unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Part name of the presentation's theme.
///
/// Looks at the main part's own theme relationship first, then at the theme of
/// its first slide master.
pub fn theme_part_name(package: &Package, main_part: &str) -> Option<String> {
    if let Ok(name) = package.related_part_by_type(main_part, rt::THEME) {
        return Some(name);
    }
    let master = package.related_part_by_type(main_part, rt::SLIDE_MASTER).ok()?;
    package.related_part_by_type(&master, rt::THEME).ok()
}

impl XmlPart for ThemePart {
    const CONTENT_TYPE: &'static str = ct::OFC_THEME;

    fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut reader = xml_reader(xml);
        let mut path = ElementPath::new();
        let mut name = String::new();
        let mut colors: Vec<ThemeColor> = Vec::new();
        let mut fonts = ThemeFonts::default();

        loop {
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let opened = matches!(event, Event::Start(_));
                    let local = e.local_name();
                    let tag = local.as_ref();

                    if path.is_empty() && tag == b"theme" {
                        name = attr_value(e, b"name")?.unwrap_or_default();
                    } else if path.ends_with(&[b"clrScheme"]) {
                        colors.push(ThemeColor {
                            name: String::from_utf8_lossy(tag).into_owned(),
                            rgb: None,
                            system_color: None,
                            last_color: None,
                        });
                    } else if path.contains(b"clrScheme") {
                        if let Some(color) = colors.last_mut() {
                            match tag {
                                b"srgbClr" if color.rgb.is_none() => color.rgb = attr_value(e, b"val")?,
                                b"sysClr" if color.system_color.is_none() => {
                                    color.system_color = attr_value(e, b"val")?;
                                    color.last_color = attr_value(e, b"lastClr")?;
                                },
                                _ => {},
                            }
                        }
                    } else if path.ends_with(&[b"majorFont"]) || path.ends_with(&[b"minorFont"]) {
                        let major = path.ends_with(&[b"majorFont"]);
                        let typeface = attr_value(e, b"typeface")?.filter(|t| !t.is_empty());
                        match (tag, major) {
                            (b"latin", true) => fonts.heading = typeface.unwrap_or_default(),
                            (b"latin", false) => fonts.body = typeface.unwrap_or_default(),
                            (b"ea", true) => fonts.heading_east_asian = typeface,
                            (b"ea", false) => fonts.body_east_asian = typeface,
                            (b"cs", true) => fonts.heading_complex_script = typeface,
                            (b"cs", false) => fonts.body_complex_script = typeface,
                            _ => {},
                        }
                    }

                    if opened {
                        path.push(tag);
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
            xml: xml.to_vec(),
            name,
            colors,
            fonts,
        })
    }

    fn to_xml(&self) -> Result<Vec<u8>> {
        Ok(self.xml.clone())
    }
}
