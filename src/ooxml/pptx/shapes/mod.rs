/// Shapes on slides, layouts and masters.
///
/// - [`Shape`]: auto shapes, text boxes and placeholders
/// - [`Picture`]: images referencing a media part
/// - [`Table`]: DrawingML tables in a graphic frame
/// - [`Chart`]: chart frames referencing a chart part
///
/// [`ShapeTree`] holds them in z-order and hands out shape ids.
pub mod autoshape;
pub mod base;
pub mod chart;
pub mod picture;
pub mod table;
pub mod textframe;
pub mod tree;

pub use autoshape::Shape;
pub use base::{Placeholder, Position, ShapeKind};
pub use chart::Chart;
pub use picture::{Crop, Picture};
pub use table::{Table, TableCell};
pub use textframe::{Alignment, BodyProperties, Paragraph, ParagraphProperties, Run, RunProperties, TextBody};
pub use tree::ShapeTree;
