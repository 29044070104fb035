//! PowerPoint (.pptx) presentations.
//!
//! The layers, bottom up:
//!
//! - [`shapes`]: the shape tree of a slide, layout or master
//! - [`parts`]: typed XML parts decoded from and encoded into the package
//! - [`Presentation`]: slide lifecycle over one owned [`Package`](crate::ooxml::opc::Package)
//! - [`Slide`]: a snapshot of one slide with placeholder lookup
//! - [`template`]: read-only template analysis
//!
//! # Example
//!
//! ```rust
//! use slidekit::ooxml::pptx::Presentation;
//!
//! let mut pres = Presentation::new()?;
//! let n = pres.add_slide("Title Slide", None)?;
//! pres.with_slide_mut(n, |slide| {
//!     slide.set_placeholder_text("title", "Quarterly review")?;
//!     slide.set_placeholder_text("subtitle", "Q3")
//! })?;
//!
//! let slide = pres.get_slide(n)?;
//! assert_eq!(slide.get_title().as_deref(), Some("Quarterly review"));
//! # Ok::<(), slidekit::ooxml::error::OoxmlError>(())
//! ```
pub mod config;
pub mod parts;
pub mod presentation;
pub mod shapes;
pub mod slide;
pub mod template;

pub use config::{LayoutFallback, LayoutTemplate, PlaceholderTemplate, PresentationConfig};
pub use parts::{LayoutInfo, PlaceholderInfo, SlideRef, ThemeColor, ThemeFonts, get_layout_by_index, get_layout_by_name};
pub use presentation::{LayoutSelector, Presentation};
pub use slide::{PlaceholderContent, ShapeDescription, Slide, SlideDescription};
pub use template::{LayoutKind, Template, TemplateAnalysis};
