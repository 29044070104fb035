/// Error types for OPC package operations
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid part name: {0}")]
    InvalidPartName(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Required package member missing: {0}")]
    MissingMember(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Duplicate relationship id '{r_id}' in {source_part}")]
    DuplicateRelationship { source_part: String, r_id: String },

    #[error("Relationship {r_id} from '{source_part}' targets missing part '{target}'")]
    DanglingRelationship {
        source_part: String,
        r_id: String,
        target: String,
    },

    #[error("Content type not found for partname: {0}")]
    ContentTypeNotFound(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("XML parsing error: {0}")]
    XmlError(String),

    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<quick_xml::Error> for OpcError {
    fn from(err: quick_xml::Error) -> Self {
        OpcError::XmlError(err.to_string())
    }
}

impl OpcError {
    /// True for errors that mean the archive itself is unusable.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            OpcError::MissingMember(_)
                | OpcError::DuplicateRelationship { .. }
                | OpcError::DanglingRelationship { .. }
                | OpcError::ContentTypeNotFound(_)
                | OpcError::XmlError(_)
                | OpcError::ZipError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OpcError>;
