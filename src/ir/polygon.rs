//! Closed polygon boundaries on the pixel lattice.

use super::coord::Coord;
use super::Pixel;

/// A pixel-corner position: `x` in `0..=width`, `y` in `0..=height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticePoint {
    pub x: u32,
    pub y: u32,
}

impl LatticePoint {
    #[inline]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn to_coord(self) -> Coord<Pixel> {
        Coord::new(self.x as f64, self.y as f64)
    }
}

/// An ordered, implicitly closed ring of lattice points.
///
/// The last vertex connects back to the first; the first vertex is not
/// repeated at the end.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<LatticePoint>,
}

impl Contour {
    pub fn new(points: Vec<LatticePoint>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over the closing edges `(p[i], p[i + 1 mod n])`.
    pub fn edges(&self) -> impl Iterator<Item = (LatticePoint, LatticePoint)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Euclidean length of the closed boundary.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.edges()
            .map(|(a, b)| {
                let dx = b.x as f64 - a.x as f64;
                let dy = b.y as f64 - a.y as f64;
                dx.hypot(dy)
            })
            .sum()
    }

    /// Shoelace area with the image y axis pointing down.
    ///
    /// Negative for the counter-clockwise (on screen) rings produced by the
    /// contour tracer; its absolute value is the enclosed area in pixels.
    pub fn signed_area(&self) -> f64 {
        let twice: i64 = self
            .edges()
            .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
            .sum();
        twice as f64 / 2.0
    }
}
