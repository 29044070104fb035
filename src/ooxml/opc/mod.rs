/// Open Packaging Conventions (OPC) implementation.
///
/// The container layer underneath a presentation:
///
/// - Part arena keyed by part name ([`Package`])
/// - Content type registry ([`ContentTypes`])
/// - Per-source relationship collections ([`Relationships`])
/// - ZIP-based physical packaging
///
/// Nothing here knows about slides; the `pptx` layer reads and writes parts
/// through [`Package::get_part`] and [`Package::set_part`].

pub mod constants;
pub mod content_types;
pub mod error;
pub mod package;
pub mod partname;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

// Re-export commonly used types
pub use content_types::ContentTypes;
pub use error::OpcError;
pub use package::Package;
pub use partname::PartName;
pub use rel::{Relationship, Relationships};
