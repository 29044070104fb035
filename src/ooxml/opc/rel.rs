/// Relationship-related objects for OPC packages.
///
/// This module provides types for managing relationships between parts in an OPC package,
/// including internal and external relationships.
use crate::common::xml::{attr_value, escape_xml, xml_reader};
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::partname::PartName;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::fmt::Write as FmtWrite;

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an rId
/// (relationship ID). Can be either internal (pointing to another part) or external
/// (pointing to an external URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - a part reference relative to the source, or an external URL
    target_ref: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(r_id: String, reltype: String, target_ref: String, is_external: bool) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            is_external,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships, this is a relative part reference.
    /// For external relationships, this is an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Numeric suffix of an `rIdN` identifier.
    fn numeric_suffix(&self) -> Option<u32> {
        self.r_id
            .strip_prefix("rId")
            .and_then(|n| atoi_simd::parse::<u32>(n.as_bytes()).ok())
    }
}

/// Collection of relationships from a single source.
///
/// Relationships are kept in insertion order so that serialization is stable
/// across a load/save cycle. Most sources carry only a handful of entries,
/// which a SmallVec stores inline.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    /// Directory of the source part, used to resolve relative targets
    base_dir: String,

    rels: SmallVec<[Relationship; 8]>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_dir` - Directory of the source part (`""` for the package)
    pub fn new<S: Into<String>>(base_dir: S) -> Self {
        Self {
            base_dir: base_dir.into(),
            rels: SmallVec::new(),
        }
    }

    /// Directory targets are resolved against.
    #[inline]
    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Add a relationship with a freshly generated ID and return that ID.
    pub fn add(&mut self, reltype: &str, target_ref: &str, is_external: bool) -> String {
        let r_id = self.next_r_id();
        self.rels.push(Relationship::new(
            r_id.clone(),
            reltype.to_string(),
            target_ref.to_string(),
            is_external,
        ));
        r_id
    }

    /// Add a relationship under an explicit ID.
    ///
    /// # Errors
    /// Fails with [`OpcError::DuplicateRelationship`] if the ID is already used.
    pub fn add_with_id(
        &mut self,
        r_id: &str,
        reltype: &str,
        target_ref: &str,
        is_external: bool,
    ) -> Result<()> {
        if self.get(r_id).is_some() {
            return Err(OpcError::DuplicateRelationship {
                source_part: self.base_dir.clone(),
                r_id: r_id.to_string(),
            });
        }
        self.rels.push(Relationship::new(
            r_id.to_string(),
            reltype.to_string(),
            target_ref.to_string(),
            is_external,
        ));
        Ok(())
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// Get or add an internal relationship to a target.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns its rId. Otherwise, creates a new one with the next rId.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> String {
        if let Some(rel) = self
            .rels
            .iter()
            .find(|rel| rel.reltype == reltype && rel.target_ref == target_ref && !rel.is_external)
        {
            return rel.r_id.clone();
        }
        self.add(reltype, target_ref, false)
    }

    /// Get the next relationship ID.
    ///
    /// `rId{n}` where `n` is one greater than the largest numeric suffix in
    /// use. Gaps left by removed relationships are never refilled, so a stale
    /// reference can never silently point at a newer target.
    pub fn next_r_id(&self) -> String {
        let max = self
            .rels
            .iter()
            .filter_map(Relationship::numeric_suffix)
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Get the single relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found,
    /// or if multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|rel| rel.reltype == reltype);
        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// All relationships of a type, in insertion order.
    pub fn with_reltype<'a>(&'a self, reltype: &'a str) -> impl Iterator<Item = &'a Relationship> {
        self.rels.iter().filter(move |rel| rel.reltype == reltype)
    }

    /// Resolve the part targeted by an internal relationship.
    pub fn target_partname(&self, r_id: &str) -> Result<PartName> {
        let rel = self
            .get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(r_id.to_string()))?;
        if rel.is_external {
            return Err(OpcError::InvalidRelationship(
                "Cannot get target_partname for external relationship".to_string(),
            ));
        }
        PartName::resolve(&self.base_dir, &rel.target_ref)
    }

    /// Get an iterator over all relationships.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|rel| rel.r_id == r_id)?;
        Some(self.rels.remove(pos))
    }

    /// Parse a `.rels` document.
    pub fn from_xml(xml: &[u8], base_dir: &str) -> Result<Self> {
        let mut rels = Self::new(base_dir);
        let mut reader = xml_reader(xml);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() != b"Relationship" {
                        continue;
                    }
                    let r_id = attr_value(e, b"Id")?;
                    let reltype = attr_value(e, b"Type")?;
                    let target_ref = attr_value(e, b"Target")?;
                    let is_external = attr_value(e, b"TargetMode")?.as_deref()
                        == Some(target_mode::EXTERNAL);

                    match (r_id, reltype, target_ref) {
                        (Some(id), Some(rt), Some(tr)) => {
                            rels.add_with_id(&id, &rt, &tr, is_external)?;
                        },
                        _ => {
                            return Err(OpcError::XmlError(
                                "Relationship element missing Id, Type or Target".to_string(),
                            ));
                        },
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
                _ => {},
            }
        }

        Ok(rels)
    }

    /// Serialize relationships to XML format.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        let _ = write!(xml, r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS);

        for rel in &self.rels {
            let mode = if rel.is_external {
                r#" TargetMode="External""#
            } else {
                ""
            };
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.r_id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target_ref),
                mode
            );
        }

        xml.push_str("</Relationships>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::constants::relationship_type as rt;

    #[test]
    fn test_next_r_id_is_max_plus_one() {
        let mut rels = Relationships::new("ppt");
        assert_eq!(rels.next_r_id(), "rId1");

        rels.add_with_id("rId1", rt::SLIDE, "slides/slide1.xml", false).unwrap();
        rels.add_with_id("rId5", rt::SLIDE, "slides/slide2.xml", false).unwrap();
        assert_eq!(rels.next_r_id(), "rId6");

        rels.remove("rId5");
        assert_eq!(rels.next_r_id(), "rId2");
    }

    #[test]
    fn test_removed_gap_is_not_refilled() {
        let mut rels = Relationships::new("ppt");
        let a = rels.add(rt::SLIDE, "slides/slide1.xml", false);
        let b = rels.add(rt::SLIDE, "slides/slide2.xml", false);
        let c = rels.add(rt::SLIDE, "slides/slide3.xml", false);
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("rId1", "rId2", "rId3"));

        rels.remove("rId2");
        assert_eq!(rels.add(rt::SLIDE, "slides/slide4.xml", false), "rId4");
    }

    #[test]
    fn test_get_or_add() {
        let mut rels = Relationships::new("ppt/slides");

        let r1 = rels.get_or_add(rt::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        let r2 = rels.get_or_add(rt::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        let r3 = rels.get_or_add(rt::SLIDE_LAYOUT, "../slideLayouts/slideLayout2.xml");

        assert_eq!(r1, "rId1");
        assert_eq!(r2, "rId1");
        assert_eq!(r3, "rId2");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut rels = Relationships::new("");
        rels.add_with_id("rId1", rt::OFFICE_DOCUMENT, "ppt/presentation.xml", false)
            .unwrap();
        assert!(matches!(
            rels.add_with_id("rId1", rt::CORE_PROPERTIES, "docProps/core.xml", false),
            Err(OpcError::DuplicateRelationship { .. })
        ));
    }

    #[test]
    fn test_xml_round_trip_keeps_targets() {
        let mut rels = Relationships::new("ppt/slides");
        rels.add(rt::SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml", false);
        rels.add(rt::HYPERLINK, "https://example.com/?a=1&b=2", true);

        let xml = rels.to_xml();
        assert!(xml.contains(r#"TargetMode="External""#));
        assert!(xml.contains("a=1&amp;b=2"));

        let parsed = Relationships::from_xml(xml.as_bytes(), "ppt/slides").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed.target_partname("rId1").unwrap().as_str(),
            "ppt/slideLayouts/slideLayout1.xml"
        );
        let link = parsed.get("rId2").unwrap();
        assert!(link.is_external());
        assert_eq!(link.target_ref(), "https://example.com/?a=1&b=2");
        assert!(parsed.target_partname("rId2").is_err());
    }
}
