//! Annotation model for labelforge.
//!
//! This module defines what the export engine consumes: vector [`Shape`]s
//! grouped per image in a [`LabelFile`], plus the typed ids and boxes the
//! encoders produce.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: class ids, image positions and annotation ids are
//!    distinct newtypes, so one cannot be passed where another is expected.
//!
//! 2. **Explicit Geometry**: shape geometry is a tagged [`ShapeKind`]; every
//!    consumer matches on it instead of guessing from the point count.
//!
//! 3. **Permissive Construction**: shapes may carry malformed geometry
//!    (wrong point count, non-finite coordinates). The rasterizer reports
//!    these rather than the parser rejecting the whole file.
//!
//! # Example
//!
//! ```
//! use labelforge::ir::{Shape, ShapeKind};
//!
//! let car = Shape::rectangle("car", (10.0, 10.0), (50.0, 50.0));
//! assert_eq!(car.shape_type, ShapeKind::Rectangle);
//! assert_eq!(car.group_id, None);
//! ```

mod bbox;
mod ids;
pub mod io_label_file;
mod model;

// Re-export core types for convenient access
pub use bbox::{BBoxXYXY, PixelBox};
pub use ids::{AnnotationId, ClassId, ImageId, InstanceKey};
pub use model::{LabelFile, Point, Shape, ShapeKind};
