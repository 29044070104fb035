//! The `[Content_Types].xml` item of an OPC package.
//!
//! Content types are discovered with the usual two-level lookup: an
//! `Override` keyed by part name wins, otherwise the `Default` for the part's
//! file extension applies. Both tables are kept sorted so the serialized item
//! is stable across saves.

use crate::common::xml::{attr_value, escape_xml, xml_reader};
use crate::ooxml::opc::constants::{content_type as ct, namespace};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::partname::PartName;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

/// Default and Override content-type mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    /// Lowercased extension -> content type
    defaults: BTreeMap<String, String>,

    /// Part name (no leading slash) -> content type
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults every presentation package starts with.
    pub fn with_standard_defaults() -> Self {
        let mut types = Self::new();
        types.add_default("rels", ct::OPC_RELATIONSHIPS);
        types.add_default("xml", ct::XML);
        types.add_default("png", ct::PNG);
        types.add_default("jpeg", ct::JPEG);
        types.add_default("gif", ct::GIF);
        types.add_default("emf", ct::X_EMF);
        types
    }

    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        self.defaults
            .insert(ext.to_ascii_lowercase(), content_type.to_string());
    }

    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        self.overrides.insert(
            part_name.trim_start_matches('/').to_string(),
            content_type.to_string(),
        );
    }

    pub fn remove_override(&mut self, part_name: &str) -> Option<String> {
        self.overrides.remove(part_name.trim_start_matches('/'))
    }

    /// Whether an extension has a Default mapping.
    #[inline]
    pub fn has_default(&self, ext: &str) -> bool {
        self.defaults.contains_key(&ext.to_ascii_lowercase())
    }

    /// Look up the content type of a part: Override first, then Default by extension.
    pub fn content_type(&self, part_name: &str) -> Option<&str> {
        let name = part_name.trim_start_matches('/');
        if let Some(ct) = self.overrides.get(name) {
            return Some(ct);
        }
        let ext = PartName::new(name).ok()?.ext().to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `[Content_Types].xml`.
    pub fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut types = Self::new();
        let mut reader = xml_reader(xml);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(content_type)) =
                            (attr_value(e, b"Extension")?, attr_value(e, b"ContentType")?)
                        {
                            types.add_default(&ext, &content_type);
                        }
                    },
                    b"Override" => {
                        if let (Some(name), Some(content_type)) =
                            (attr_value(e, b"PartName")?, attr_value(e, b"ContentType")?)
                        {
                            types.add_override(&name, &content_type);
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
        }

        Ok(types)
    }

    /// Generate the XML for `[Content_Types].xml`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(
            256 + self.defaults.len() * 96 + self.overrides.len() * 160,
        );

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        let _ = write!(xml, r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES);

        for (ext, content_type) in &self.defaults {
            let _ = write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            );
        }

        for (name, content_type) in &self.overrides {
            let _ = write!(
                xml,
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                escape_xml(name),
                escape_xml(content_type)
            );
        }

        xml.push_str("</Types>");
        xml
    }
}
