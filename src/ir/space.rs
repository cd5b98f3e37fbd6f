//! Coordinate space marker types.
//!
//! Zero-sized types used as type parameters so pixel-space geometry coming
//! out of the contour tracer can never be written to a label file without
//! passing through normalization first.

use std::fmt;

/// Marker type for pixel coordinates.
///
/// Contour vertices live on the pixel lattice: `(0, 0)` is the top-left
/// corner of the top-left pixel and `(width, height)` the bottom-right corner
/// of the bottom-right pixel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for image-relative coordinates in `[0, 1]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
