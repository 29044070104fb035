//! Slidekit - build, read and modify PowerPoint (.pptx) presentations
//!
//! The crate opens a `.pptx` package, lets callers add, delete, duplicate and
//! reorder slides built from the template's layouts, fill their placeholders,
//! and writes the package back out. Everything it does not model (backgrounds,
//! transitions, notes, media it did not create) survives the round trip
//! untouched.
//!
//! # Features
//!
//! - **OPC container**: parts, content types and relationships over ZIP
//! - **Slide lifecycle**: add from a layout, delete, duplicate, reorder
//! - **Placeholders**: lookup by friendly name, text replacement
//! - **Shapes**: text boxes, tables, images and z-order on a slide
//! - **Template analysis**: layouts, placeholder slots, theme colors and fonts
//!
//! # Example - Building a deck
//!
//! ```no_run
//! use slidekit::Presentation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pres = Presentation::from_template("corporate.potx")?;
//! let n = pres.add_slide("Title and Content", None)?;
//! pres.with_slide_mut(n, |slide| {
//!     slide.set_placeholder_text("title", "Roadmap")?;
//!     slide.set_placeholder_text("content", "Ship\nMeasure\nRepeat")
//! })?;
//! pres.save("roadmap.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Inspecting a template
//!
//! ```no_run
//! use slidekit::{LayoutKind, Template};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = Template::open("corporate.potx")?;
//! for layout in template.describe() {
//!     println!("{} {:?}: {:?}", layout.index, layout.name, layout.placeholders);
//! }
//! println!("two-column layouts: {:?}", template.recommend_layout(LayoutKind::TwoContent));
//! # Ok(())
//! # }
//! ```

/// Unit conversions and XML helpers
pub mod common;

/// OOXML container and PresentationML implementation
pub mod ooxml;

// Re-export the presentation API
pub use ooxml::pptx::{
    LayoutFallback, LayoutKind, LayoutSelector, Presentation, PresentationConfig, Slide, Template,
    TemplateAnalysis,
};

// Re-export error types
pub use ooxml::error::{OoxmlError, Result};
