//! XML helpers shared by the package and part layers.

pub mod escape;
pub mod reader;
pub mod retained;

pub use escape::escape_xml;
pub use reader::{
    ElementPath, attr_i64, attr_prefixed, attr_u32, attr_value, capture_content, capture_element, push_entity, push_raw,
    push_text, xml_reader,
};
pub use retained::Retained;
