//! Package writer for OPC packages.
//!
//! This module serializes an in-memory package: `[Content_Types].xml`, the
//! package relationships, then every part followed by its relationships.

use crate::ooxml::opc::error::Result;
use crate::ooxml::opc::package::Package;
use crate::ooxml::opc::partname::{CONTENT_TYPES_MEMBER, PACKAGE_SOURCE, rels_member_for};
use crate::ooxml::opc::phys_pkg::PhysPkgWriter;
use std::path::Path;

/// Package writer that serializes an OPC package to a ZIP archive.
///
/// The package is validated first; nothing is written when validation fails.
///
/// # Example
///
/// ```no_run
/// use slidekit::ooxml::opc::Package;
/// use slidekit::ooxml::opc::pkgwriter::PackageWriter;
///
/// let pkg = Package::open_path("input.pptx")?;
/// PackageWriter::write("output.pptx", &pkg)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PackageWriter;

impl PackageWriter {
    /// Write an OPC package to a file.
    pub fn write<P: AsRef<Path>>(path: P, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write an OPC package to a stream.
    pub fn write_to_stream<W: std::io::Write>(mut writer: W, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize an OPC package to bytes.
    pub fn to_bytes(package: &Package) -> Result<Vec<u8>> {
        package.validate()?;

        let mut phys_writer = PhysPkgWriter::new();

        phys_writer.write(CONTENT_TYPES_MEMBER, package.content_types().to_xml().as_bytes())?;
        Self::write_rels(&mut phys_writer, package, PACKAGE_SOURCE, true)?;
        Self::write_parts(&mut phys_writer, package)?;

        let bytes = phys_writer.finish()?;
        tracing::debug!(
            parts = package.part_names().count(),
            bytes = bytes.len(),
            "serialized package"
        );
        Ok(bytes)
    }

    /// Write all parts and their relationships.
    fn write_parts(phys_writer: &mut PhysPkgWriter, package: &Package) -> Result<()> {
        for (name, blob) in package.iter_parts() {
            phys_writer.write(name, blob)?;
            Self::write_rels(phys_writer, package, name, false)?;
        }
        Ok(())
    }

    /// Write the `.rels` item of a source, skipping empty collections unless `always`.
    fn write_rels(
        phys_writer: &mut PhysPkgWriter,
        package: &Package,
        source: &str,
        always: bool,
    ) -> Result<()> {
        match package.rels(source) {
            Some(rels) if always || !rels.is_empty() => {
                phys_writer.write(&rels_member_for(source), rels.to_xml().as_bytes())
            },
            None if always => {
                let empty = crate::ooxml::opc::rel::Relationships::new(source);
                phys_writer.write(&rels_member_for(source), empty.to_xml().as_bytes())
            },
            _ => Ok(()),
        }
    }
}
