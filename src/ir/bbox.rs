//! Axis-aligned bounding boxes in XYXY form.

use super::coord::Coord;
use super::polygon::LatticePoint;
use super::{Normalized, Pixel};

/// An axis-aligned bounding box stored as (xmin, ymin, xmax, ymax).
///
/// `TSpace` is either [`Pixel`] or [`Normalized`].
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns (center_x, center_y, width, height), the YOLO box layout.
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        (
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            self.width(),
            self.height(),
        )
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl BBoxXYXY<Pixel> {
    /// Bounding box of a set of lattice points, `None` when the set is empty.
    pub fn enclosing(points: &[LatticePoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            xmin = xmin.min(p.x);
            ymin = ymin.min(p.y);
            xmax = xmax.max(p.x);
            ymax = ymax.max(p.y);
        }
        Some(Self::from_xyxy(
            xmin as f64,
            ymin as f64,
            xmax as f64,
            ymax as f64,
        ))
    }

    /// Converts pixel coordinates to image-relative coordinates.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Normalized> {
        BBoxXYXY {
            min: self.min.to_normalized(image_width, image_height),
            max: self.max.to_normalized(image_width, image_height),
        }
    }
}
