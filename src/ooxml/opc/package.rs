/// Objects that implement reading and writing OPC packages.
///
/// This module provides the main [`Package`] type, which represents an Open
/// Packaging Convention package in memory. Parts live in an arena keyed by part
/// name; relationship collections keyed by source part are the only links
/// between them, so no part ever owns another.
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::ooxml::opc::constants::{content_type as ct, relationship_type as rt};
use crate::ooxml::opc::content_types::ContentTypes;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::partname::{PACKAGE_SOURCE, PartName, base_dir_of};
use crate::ooxml::opc::phys_pkg::PhysPkgReader;
use crate::ooxml::opc::pkgreader::PackageReader;
use crate::ooxml::opc::pkgwriter::PackageWriter;
use crate::ooxml::opc::rel::Relationships;

const CORE_PROPS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
    r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
    r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    "<dc:title>Presentation</dc:title><cp:revision>1</cp:revision></cp:coreProperties>"
);

const APP_PROPS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" "#,
    r#"xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">"#,
    "<Application>slidekit</Application></Properties>"
);

/// Main API class for working with OPC packages.
///
/// `Package` owns every part's bytes, the content-type registry and the
/// relationship collection of every source (the package itself is the source
/// `""`). Higher layers read parts with [`get_part`](Self::get_part) and write
/// them back with [`set_part`](Self::set_part).
#[derive(Debug, Clone)]
pub struct Package {
    /// Part name -> bytes
    parts: BTreeMap<String, Vec<u8>>,

    content_types: ContentTypes,

    /// Source part name -> outgoing relationships
    rels: HashMap<String, Relationships>,
}

impl Package {
    /// Create a new empty package with the standard extension defaults.
    pub fn new() -> Self {
        let mut rels = HashMap::new();
        rels.insert(PACKAGE_SOURCE.to_string(), Relationships::new(PACKAGE_SOURCE));
        Self {
            parts: BTreeMap::new(),
            content_types: ContentTypes::with_standard_defaults(),
            rels,
        }
    }

    /// Create the skeleton every presentation package starts from.
    ///
    /// Contains the document property parts and the three package-level
    /// relationships. The main document `ppt/presentation.xml` is related but
    /// not created; the caller adds it before saving.
    pub fn blank() -> Self {
        let mut package = Self::new();
        package.parts.insert("docProps/core.xml".to_string(), CORE_PROPS_XML.as_bytes().to_vec());
        package
            .content_types
            .add_override("docProps/core.xml", ct::OPC_CORE_PROPERTIES);
        package.parts.insert("docProps/app.xml".to_string(), APP_PROPS_XML.as_bytes().to_vec());
        package
            .content_types
            .add_override("docProps/app.xml", ct::OFC_EXTENDED_PROPERTIES);

        let pkg_rels = package.rels_mut(PACKAGE_SOURCE);
        pkg_rels.add(rt::OFFICE_DOCUMENT, "ppt/presentation.xml", false);
        pkg_rels.add(rt::CORE_PROPERTIES, "docProps/core.xml", false);
        pkg_rels.add(rt::EXTENDED_PROPERTIES, "docProps/app.xml", false);
        package
    }

    /// Open a package from the bytes of a `.pptx` archive.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from a file.
    ///
    /// # Example
    /// ```no_run
    /// use slidekit::ooxml::opc::Package;
    ///
    /// let pkg = Package::open_path("deck.pptx").unwrap();
    /// ```
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::open(path)?)
    }

    /// Load a package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::new(reader)?)
    }

    fn from_phys_reader(phys_reader: PhysPkgReader) -> Result<Self> {
        let PackageReader {
            content_types,
            mut rels,
            parts,
        } = PackageReader::from_phys_reader(phys_reader)?;

        rels.entry(PACKAGE_SOURCE.to_string())
            .or_insert_with(|| Relationships::new(PACKAGE_SOURCE));

        tracing::debug!(
            parts = parts.len(),
            bytes = parts.values().map(Vec::len).sum::<usize>(),
            "opened package"
        );

        Ok(Self {
            parts,
            content_types,
            rels,
        })
    }

    /// Get the bytes of a part.
    #[inline]
    pub fn get_part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .get(name.trim_start_matches('/'))
            .map(Vec::as_slice)
    }

    /// Get the bytes of a part, failing with [`OpcError::PartNotFound`].
    pub fn part(&self, name: &str) -> Result<&[u8]> {
        self.get_part(name)
            .ok_or_else(|| OpcError::PartNotFound(name.to_string()))
    }

    /// Store a part.
    ///
    /// A given content type is registered as an override unless the default
    /// for the part's extension already maps to the same type.
    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<()> {
        let partname = PartName::new(name)?;
        if let Some(content_type) = content_type {
            let by_default = self
                .content_types
                .defaults()
                .any(|(ext, ct)| ext.eq_ignore_ascii_case(partname.ext()) && ct == content_type);
            if by_default {
                self.content_types.remove_override(partname.as_str());
            } else {
                self.content_types.add_override(partname.as_str(), content_type);
            }
        }
        self.parts.insert(partname.into_string(), bytes);
        Ok(())
    }

    /// Remove a part together with its outgoing relationships and its override.
    ///
    /// Relationships from other parts that target it are left alone; callers
    /// remove those first.
    pub fn remove_part(&mut self, name: &str) -> Option<Vec<u8>> {
        let name = name.trim_start_matches('/');
        let removed = self.parts.remove(name)?;
        self.rels.remove(name);
        self.content_types.remove_override(name);
        Some(removed)
    }

    /// Remove a part and every relationship that targets it.
    ///
    /// Parts it related to go as well once nothing else targets them, so a
    /// slide takes its notes slide along while layouts and shared media stay.
    /// Returns the removed part names, `name` first.
    pub fn drop_part(&mut self, name: &str) -> Vec<String> {
        let mut removed = Vec::new();
        let mut pending = vec![name.trim_start_matches('/').to_string()];
        while let Some(name) = pending.pop() {
            if !self.parts.contains_key(&name) {
                continue;
            }
            let targets = self.internal_targets(&name);
            self.unlink(&name);
            self.remove_part(&name);
            removed.push(name);
            pending.extend(targets.into_iter().filter(|t| !self.is_targeted(t)));
        }
        removed
    }

    /// Remove relationship `r_id` of `source`, dropping its target with
    /// [`drop_part`](Self::drop_part) when nothing else targets it.
    pub fn drop_relationship(&mut self, source: &str, r_id: &str) -> Vec<String> {
        let source = source.trim_start_matches('/');
        let Some(rels) = self.rels.get_mut(source) else {
            return Vec::new();
        };
        let target = rels
            .get(r_id)
            .filter(|rel| !rel.is_external())
            .and_then(|rel| rels.target_partname(rel.r_id()).ok());
        rels.remove(r_id);
        match target {
            Some(target) if !self.is_targeted(target.as_str()) => self.drop_part(target.as_str()),
            _ => Vec::new(),
        }
    }

    /// Whether any internal relationship targets `name`.
    pub fn is_targeted(&self, name: &str) -> bool {
        let name = name.trim_start_matches('/');
        self.rels.values().any(|rels| {
            rels.iter()
                .filter(|rel| !rel.is_external())
                .any(|rel| rels.target_partname(rel.r_id()).is_ok_and(|t| t.as_str() == name))
        })
    }

    fn internal_targets(&self, source: &str) -> Vec<String> {
        self.rels(source)
            .map(|rels| {
                rels.iter()
                    .filter(|rel| !rel.is_external())
                    .filter_map(|rel| rels.target_partname(rel.r_id()).ok())
                    .map(PartName::into_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove every relationship, from any source, that targets `name`.
    fn unlink(&mut self, name: &str) {
        for rels in self.rels.values_mut() {
            let doomed: Vec<String> = rels
                .iter()
                .filter(|rel| !rel.is_external())
                .filter(|rel| rels.target_partname(rel.r_id()).is_ok_and(|t| t.as_str() == name))
                .map(|rel| rel.r_id().to_string())
                .collect();
            for r_id in doomed {
                rels.remove(&r_id);
            }
        }
    }

    /// Iterate part names in sorted order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    #[inline]
    pub fn contains_part(&self, name: &str) -> bool {
        self.parts.contains_key(name.trim_start_matches('/'))
    }

    /// Lowest free part name for a template containing `%d`.
    ///
    /// For example, `ppt/slides/slide%d.xml` gives `ppt/slides/slide3.xml`
    /// when slides 1 and 2 exist.
    pub fn next_partname(&self, template: &str) -> Result<String> {
        if !template.contains("%d") {
            return Err(OpcError::InvalidPartName(template.to_string()));
        }
        let mut n = 1u32;
        loop {
            let candidate = template.replacen("%d", &n.to_string(), 1);
            if !self.contains_part(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Relationships of a source, `""` for the package.
    #[inline]
    pub fn rels(&self, source: &str) -> Option<&Relationships> {
        self.rels.get(source.trim_start_matches('/'))
    }

    /// Relationships of a source, created empty on first use.
    pub fn rels_mut(&mut self, source: &str) -> &mut Relationships {
        let source = source.trim_start_matches('/');
        self.rels
            .entry(source.to_string())
            .or_insert_with(|| Relationships::new(base_dir_of(source)))
    }

    /// Package-level relationships.
    #[inline]
    pub fn package_rels(&self) -> Option<&Relationships> {
        self.rels(PACKAGE_SOURCE)
    }

    /// Relate `source` to the part `target`, reusing an identical relationship.
    ///
    /// The stored target is relative to the source's directory.
    pub fn relate_to(&mut self, source: &str, target: &str, reltype: &str) -> Result<String> {
        let source = source.trim_start_matches('/');
        let target = PartName::new(target)?;
        let target_ref = target.relative_ref(base_dir_of(source));
        Ok(self.rels_mut(source).get_or_add(reltype, &target_ref))
    }

    /// Resolve the part targeted by relationship `r_id` of `source`.
    pub fn related_part_name(&self, source: &str, r_id: &str) -> Result<String> {
        let rels = self
            .rels(source)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("{} in '{}'", r_id, source)))?;
        Ok(rels.target_partname(r_id)?.into_string())
    }

    /// Resolve the single relationship of `reltype` from `source` to a part name.
    pub fn related_part_by_type(&self, source: &str, reltype: &str) -> Result<String> {
        let rels = self
            .rels(source)
            .ok_or_else(|| OpcError::RelationshipNotFound(reltype.to_string()))?;
        let rel = rels.part_with_reltype(reltype)?;
        Ok(rels.target_partname(rel.r_id())?.into_string())
    }

    /// Part name of the main document (`officeDocument` package relationship).
    pub fn main_document_part(&self) -> Result<String> {
        self.related_part_by_type(PACKAGE_SOURCE, rt::OFFICE_DOCUMENT)
    }

    /// Content type of a part.
    #[inline]
    pub fn content_type(&self, name: &str) -> Option<&str> {
        self.content_types.content_type(name)
    }

    #[inline]
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    #[inline]
    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// Iterate `(part name, bytes)` in name order.
    pub fn iter_parts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate `(source, relationships)` pairs in no particular order.
    pub fn iter_rels(&self) -> impl Iterator<Item = (&str, &Relationships)> {
        self.rels.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check the invariants every saved package must satisfy.
    ///
    /// Every part needs a content type and every internal relationship must
    /// target an existing part.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self
            .parts
            .keys()
            .find(|name| self.content_types.content_type(name).is_none())
        {
            return Err(OpcError::ContentTypeNotFound(name.clone()));
        }

        for (source, rels) in &self.rels {
            if source != PACKAGE_SOURCE && !self.parts.contains_key(source) {
                if rels.is_empty() {
                    continue;
                }
                return Err(OpcError::MissingMember(format!(
                    "relationship source '{}'",
                    source
                )));
            }
            for rel in rels.iter().filter(|rel| !rel.is_external()) {
                let target = rels.target_partname(rel.r_id())?;
                if !self.parts.contains_key(target.as_str()) {
                    return Err(OpcError::DanglingRelationship {
                        source_part: source.clone(),
                        r_id: rel.r_id().to_string(),
                        target: target.into_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize the package to the bytes of a ZIP archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }

    /// Write the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;

    fn minimal_package() -> Package {
        let mut pkg = Package::blank();
        pkg.set_part(
            "ppt/presentation.xml",
            b"<p:presentation/>".to_vec(),
            Some(ct::PML_PRESENTATION_MAIN),
        )
        .unwrap();
        pkg
    }

    #[test]
    fn test_blank_round_trip() {
        let pkg = minimal_package();
        let bytes = pkg.to_bytes().unwrap();

        let reopened = Package::open(&bytes).unwrap();
        assert_eq!(reopened.main_document_part().unwrap(), "ppt/presentation.xml");
        assert_eq!(
            reopened.content_type("ppt/presentation.xml"),
            Some(ct::PML_PRESENTATION_MAIN)
        );
        assert_eq!(reopened.part_names().count(), 3);
        assert_eq!(reopened.package_rels().unwrap().len(), 3);
    }

    #[test]
    fn test_save_rejects_dangling_relationship() {
        let mut pkg = minimal_package();
        pkg.rels_mut("ppt/presentation.xml")
            .add(rt::SLIDE, "slides/slide1.xml", false);

        let err = pkg.to_bytes().unwrap_err();
        assert!(matches!(err, OpcError::DanglingRelationship { .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_save_rejects_untyped_part() {
        let mut pkg = minimal_package();
        pkg.set_part("ppt/media/movie.mp4", vec![0, 1, 2], None).unwrap();
        assert!(matches!(pkg.to_bytes(), Err(OpcError::ContentTypeNotFound(_))));
    }

    #[test]
    fn test_set_part_uses_default_when_identical() {
        let mut pkg = Package::new();
        pkg.set_part("ppt/media/image1.png", vec![1], Some(ct::PNG)).unwrap();
        assert_eq!(pkg.content_types().overrides().count(), 0);
        assert_eq!(pkg.content_type("ppt/media/image1.png"), Some(ct::PNG));

        pkg.set_part("ppt/slides/slide1.xml", vec![], Some(ct::PML_SLIDE)).unwrap();
        assert_eq!(pkg.content_types().overrides().count(), 1);
    }

    #[test]
    fn test_remove_part_drops_rels_and_override() {
        let mut pkg = minimal_package();
        pkg.set_part("ppt/slides/slide1.xml", b"<p:sld/>".to_vec(), Some(ct::PML_SLIDE))
            .unwrap();
        pkg.rels_mut("ppt/slides/slide1.xml")
            .add(rt::IMAGE, "../media/image1.png", false);

        assert!(pkg.remove_part("ppt/slides/slide1.xml").is_some());
        assert!(pkg.rels("ppt/slides/slide1.xml").is_none());
        assert_eq!(pkg.content_type("ppt/slides/slide1.xml"), Some(ct::XML));
        assert!(pkg.remove_part("ppt/slides/slide1.xml").is_none());
    }

    #[test]
    fn test_drop_part_takes_owned_parts_along() {
        let mut pkg = minimal_package();
        let slide = "ppt/slides/slide1.xml";
        let notes = "ppt/notesSlides/notesSlide1.xml";
        let master = "ppt/notesMasters/notesMaster1.xml";
        for name in [slide, notes, master] {
            pkg.set_part(name, b"<x/>".to_vec(), Some(ct::XML)).unwrap();
        }
        pkg.set_part("ppt/media/image1.png", vec![1], Some(ct::PNG)).unwrap();
        pkg.set_part("ppt/media/image2.png", vec![2], Some(ct::PNG)).unwrap();

        pkg.relate_to("ppt/presentation.xml", slide, rt::SLIDE).unwrap();
        pkg.relate_to("ppt/presentation.xml", master, rt::NOTES_MASTER).unwrap();
        pkg.relate_to(slide, notes, rt::NOTES_SLIDE).unwrap();
        pkg.relate_to(slide, "ppt/media/image1.png", rt::IMAGE).unwrap();
        pkg.relate_to(slide, "ppt/media/image2.png", rt::IMAGE).unwrap();
        pkg.relate_to(notes, slide, rt::SLIDE).unwrap();
        pkg.relate_to(notes, master, rt::NOTES_MASTER).unwrap();
        pkg.relate_to(master, "ppt/media/image2.png", rt::IMAGE).unwrap();

        let mut removed = pkg.drop_part(slide);
        removed.sort();
        assert_eq!(removed, vec!["ppt/media/image1.png", notes, slide]);
        assert!(pkg.contains_part(master));
        assert!(pkg.contains_part("ppt/media/image2.png"));
        assert!(pkg.rels("ppt/presentation.xml").unwrap().with_reltype(rt::SLIDE).next().is_none());
        assert!(pkg.to_bytes().is_ok());
    }

    #[test]
    fn test_drop_relationship_keeps_shared_targets() {
        let mut pkg = minimal_package();
        pkg.set_part("ppt/slides/slide1.xml", b"<x/>".to_vec(), Some(ct::XML)).unwrap();
        pkg.set_part("ppt/slides/slide2.xml", b"<x/>".to_vec(), Some(ct::XML)).unwrap();
        pkg.set_part("ppt/media/image1.png", vec![1], Some(ct::PNG)).unwrap();
        let a = pkg.relate_to("ppt/slides/slide1.xml", "ppt/media/image1.png", rt::IMAGE).unwrap();
        let b = pkg.relate_to("ppt/slides/slide2.xml", "ppt/media/image1.png", rt::IMAGE).unwrap();

        assert!(pkg.drop_relationship("ppt/slides/slide1.xml", &a).is_empty());
        assert!(pkg.contains_part("ppt/media/image1.png"));
        assert_eq!(pkg.drop_relationship("ppt/slides/slide2.xml", &b), vec!["ppt/media/image1.png"]);
        assert!(!pkg.contains_part("ppt/media/image1.png"));
        assert!(pkg.drop_relationship("ppt/slides/slide2.xml", &b).is_empty());
    }

    #[test]
    fn test_next_partname_and_relate() {
        let mut pkg = minimal_package();
        assert_eq!(pkg.next_partname("ppt/slides/slide%d.xml").unwrap(), "ppt/slides/slide1.xml");
        pkg.set_part("ppt/slides/slide1.xml", vec![], Some(ct::PML_SLIDE)).unwrap();
        pkg.set_part("ppt/slides/slide3.xml", vec![], Some(ct::PML_SLIDE)).unwrap();
        assert_eq!(pkg.next_partname("ppt/slides/slide%d.xml").unwrap(), "ppt/slides/slide2.xml");

        let r_id = pkg
            .relate_to("ppt/presentation.xml", "ppt/slides/slide3.xml", rt::SLIDE)
            .unwrap();
        assert_eq!(
            pkg.rels("ppt/presentation.xml").unwrap().get(&r_id).unwrap().target_ref(),
            "slides/slide3.xml"
        );
        assert_eq!(
            pkg.related_part_name("ppt/presentation.xml", &r_id).unwrap(),
            "ppt/slides/slide3.xml"
        );
    }

    #[test]
    fn test_open_passes_unknown_parts_through() {
        use std::io::Write;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(
            br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="bin" ContentType="application/octet-stream"/></Types>"#,
        )
        .unwrap();
        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#,
        )
        .unwrap();
        zip.start_file("custom/blob.bin", options).unwrap();
        zip.write_all(&[9, 8, 7]).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let pkg = Package::open(&bytes).unwrap();
        assert_eq!(pkg.get_part("custom/blob.bin"), Some(&[9u8, 8, 7][..]));

        let again = Package::open(&pkg.to_bytes().unwrap()).unwrap();
        assert_eq!(again.get_part("/custom/blob.bin"), Some(&[9u8, 8, 7][..]));
    }

    #[test]
    fn test_save_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skeleton.pptx");

        minimal_package().save(&path).unwrap();
        let pkg = Package::open_path(&path).unwrap();
        assert!(pkg.contains_part("docProps/app.xml"));
    }
}
