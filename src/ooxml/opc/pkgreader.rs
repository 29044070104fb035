//! Low-level, read-only API to a serialized Open Packaging Convention (OPC) package.
//!
//! Splits the members of a physical package into the three tables the
//! in-memory [`Package`](super::package::Package) is built from: part blobs,
//! the content-type registry and one relationship collection per source.

use crate::ooxml::opc::content_types::ContentTypes;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::partname::{
    CONTENT_TYPES_MEMBER, PACKAGE_SOURCE, base_dir_of, rels_member_for, source_for_rels_member,
};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::rel::Relationships;
use std::collections::{BTreeMap, HashMap};

/// Package reader holding the decoded tables of a package.
pub struct PackageReader {
    pub content_types: ContentTypes,

    /// Source part name (`""` for the package) -> relationships
    pub rels: HashMap<String, Relationships>,

    /// Part name -> bytes, every member except the content types and `.rels` items
    pub parts: BTreeMap<String, Vec<u8>>,
}

impl PackageReader {
    /// Decode a physical package.
    ///
    /// # Errors
    /// [`OpcError::MissingMember`] when `[Content_Types].xml` or `_rels/.rels`
    /// is absent, and XML errors for malformed items.
    pub fn from_phys_reader(phys_reader: PhysPkgReader) -> Result<Self> {
        let package_rels_member = rels_member_for(PACKAGE_SOURCE);
        if !phys_reader.contains(CONTENT_TYPES_MEMBER) {
            return Err(OpcError::MissingMember(CONTENT_TYPES_MEMBER.to_string()));
        }
        if !phys_reader.contains(&package_rels_member) {
            return Err(OpcError::MissingMember(package_rels_member));
        }

        let mut content_types = None;
        let mut rels = HashMap::new();
        let mut parts = BTreeMap::new();

        for (member, blob) in phys_reader.into_members() {
            if member == CONTENT_TYPES_MEMBER {
                content_types = Some(ContentTypes::from_xml(&blob)?);
            } else if let Some(source) = source_for_rels_member(&member) {
                let collection = Relationships::from_xml(&blob, base_dir_of(&source))?;
                rels.insert(source, collection);
            } else {
                parts.insert(member, blob);
            }
        }

        let content_types =
            content_types.ok_or_else(|| OpcError::MissingMember(CONTENT_TYPES_MEMBER.to_string()))?;

        let mut reader = Self {
            content_types,
            rels,
            parts,
        };
        reader.drop_dangling();
        reader.report_untyped();
        Ok(reader)
    }

    /// Remove internal relationships whose target is not a member.
    fn drop_dangling(&mut self) {
        for (source, collection) in self.rels.iter_mut() {
            let dangling: Vec<String> = collection
                .iter()
                .filter(|rel| !rel.is_external())
                .filter(|rel| match collection.target_partname(rel.r_id()) {
                    Ok(target) => !self.parts.contains_key(target.as_str()),
                    Err(_) => true,
                })
                .map(|rel| rel.r_id().to_string())
                .collect();

            for r_id in dangling {
                if let Some(rel) = collection.remove(&r_id) {
                    tracing::warn!(
                        source = %source,
                        r_id = %r_id,
                        target = %rel.target_ref(),
                        "dropping dangling relationship"
                    );
                }
            }
        }
    }

    fn report_untyped(&self) {
        for name in self.parts.keys() {
            if self.content_types.content_type(name).is_none() {
                tracing::warn!(part = %name, "part has no content type");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::opc::phys_pkg::PhysPkgWriter;

    const TYPES: &[u8] = br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
</Types>"#;

    const PKG_RELS: &[u8] = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#;

    const PRES_RELS: &[u8] = br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide9.xml"/>
</Relationships>"#;

    fn build(members: &[(&str, &[u8])]) -> PhysPkgReader {
        let mut writer = PhysPkgWriter::new();
        for (name, blob) in members {
            writer.write(name, blob).unwrap();
        }
        PhysPkgReader::from_bytes(&writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_splits_members() {
        let phys = build(&[
            ("[Content_Types].xml", TYPES),
            ("_rels/.rels", PKG_RELS),
            ("ppt/presentation.xml", b"<p:presentation/>"),
            ("ppt/_rels/presentation.xml.rels", PRES_RELS),
            ("ppt/slides/slide1.xml", b"<p:sld/>"),
        ]);

        let reader = PackageReader::from_phys_reader(phys).unwrap();
        assert_eq!(reader.parts.len(), 2);
        assert!(reader.rels.contains_key(""));

        let pres_rels = &reader.rels["ppt/presentation.xml"];
        assert_eq!(pres_rels.base_dir(), "ppt");
        // rId2 points at a member that does not exist
        assert_eq!(pres_rels.len(), 1);
        assert!(pres_rels.get("rId2").is_none());
    }

    #[test]
    fn test_missing_content_types() {
        let phys = build(&[("_rels/.rels", PKG_RELS)]);
        assert!(matches!(
            PackageReader::from_phys_reader(phys),
            Err(OpcError::MissingMember(name)) if name == "[Content_Types].xml"
        ));
    }

    #[test]
    fn test_missing_package_rels() {
        let phys = build(&[("[Content_Types].xml", TYPES)]);
        assert!(matches!(
            PackageReader::from_phys_reader(phys),
            Err(OpcError::MissingMember(name)) if name == "_rels/.rels"
        ));
    }
}
