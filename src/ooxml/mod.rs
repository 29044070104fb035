//! Office Open XML presentation support.
//!
//! Two layers:
//!
//! 1. **OPC** (`opc`): the ZIP container, content types and relationships
//! 2. **PresentationML** (`pptx`): presentation, slides, layouts, masters and
//!    themes on top of the container
//!
//! ```rust
//! use slidekit::ooxml::pptx::Presentation;
//!
//! let mut pres = Presentation::new()?;
//! pres.add_slide("Title and Content", None)?;
//! let reopened = Presentation::open(&pres.to_bytes()?)?;
//! assert_eq!(reopened.slide_count()?, 1);
//! # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
//! ```
pub mod error;
pub mod opc;
pub mod pptx;

pub use error::{OoxmlError, Result};
pub use opc::{OpcError, Package};
