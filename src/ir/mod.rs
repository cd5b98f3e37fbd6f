//! Typed geometry and dataset model for the conversion pipeline.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: coordinate spaces are marker types, so pixel-space
//!    contours cannot be emitted without normalization.
//!
//! 2. **Lattice geometry**: contours are traced along pixel edges, so every
//!    vertex is an integer pixel corner and normalized values stay in `[0, 1]`.
//!
//! # Example
//!
//! ```
//! use blenderline::ir::{BinaryMask, Instance, LoadedImage, ImageKey};
//!
//! let mask = BinaryMask::from_fn(100, 100, |x, y| (25..75).contains(&x) && (25..75).contains(&y));
//! let image = LoadedImage {
//!     key: ImageKey::new("000001"),
//!     width: 100,
//!     height: 100,
//!     instances: vec![Instance::new(2u32, mask)],
//! };
//! assert_eq!(image.instances[0].mask.count(), 2500);
//! ```

mod bbox;
mod coord;
mod ids;
mod mask;
mod model;
mod polygon;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use ids::{ClassId, ImageKey};
pub use mask::BinaryMask;
pub use model::{AnnotationRecord, FragmentCounts, Geometry, Instance, LoadedImage};
pub use polygon::{Contour, LatticePoint};
pub use space::{Normalized, Pixel};
