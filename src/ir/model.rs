//! Dataset-level model: instances going in, annotation records coming out.

use serde::Serialize;

use super::bbox::BBoxXYXY;
use super::coord::Coord;
use super::ids::{ClassId, ImageKey};
use super::mask::BinaryMask;
use super::Normalized;

/// One labeled object occurrence inside a rendered image.
#[derive(Clone, Debug)]
pub struct Instance {
    /// Class of the object.
    pub class_id: ClassId,

    /// Occupancy grid with the same dimensions as the parent image.
    pub mask: BinaryMask,
}

impl Instance {
    pub fn new(class_id: impl Into<ClassId>, mask: BinaryMask) -> Self {
        Self {
            class_id: class_id.into(),
            mask,
        }
    }
}

/// An image with all of its instances loaded and checked against it.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub key: ImageKey,
    pub width: u32,
    pub height: u32,
    pub instances: Vec<Instance>,
}

impl LoadedImage {
    /// Total pixel count of the image.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Output geometry of a single retained fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box, rendered as center/size.
    Box(BBoxXYXY<Normalized>),
    /// Simplified outline, rendered as a flat x/y list.
    Polygon(Vec<Coord<Normalized>>),
}

impl Geometry {
    /// Every coordinate this geometry will emit.
    pub fn coords(&self) -> Vec<Coord<Normalized>> {
        match self {
            Geometry::Box(bbox) => vec![bbox.min, bbox.max],
            Geometry::Polygon(points) => points.clone(),
        }
    }
}

/// One output line: a class id plus normalized geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRecord {
    pub class_id: ClassId,
    pub geometry: Geometry,
}

/// Per-image bookkeeping collected while building annotation records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FragmentCounts {
    /// Instances read from the manifest.
    pub instances: usize,
    /// Instances whose mask had no occupied pixel.
    pub empty_masks: usize,
    /// Fragments that made it into the label file.
    pub emitted: usize,
    /// Fragments dropped by the area filter.
    pub below_min_area: usize,
}

impl FragmentCounts {
    pub fn merge(&mut self, other: &FragmentCounts) {
        self.instances += other.instances;
        self.empty_masks += other.empty_masks;
        self.emitted += other.emitted;
        self.below_min_area += other.below_min_area;
    }
}
