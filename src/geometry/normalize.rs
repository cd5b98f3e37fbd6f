//! Pixel-to-image-relative coordinate mapping.

use crate::ir::{BBoxXYXY, Contour, Coord, Normalized};

/// Normalized bounding box of the contour's vertices.
pub fn normalize_box(contour: &Contour, width: u32, height: u32) -> Option<BBoxXYXY<Normalized>> {
    BBoxXYXY::enclosing(&contour.points)
        .map(|bbox| bbox.to_normalized(width as f64, height as f64))
}

/// Every vertex divided by the image dimensions, in contour order.
pub fn normalize_polygon(contour: &Contour, width: u32, height: u32) -> Vec<Coord<Normalized>> {
    contour
        .points
        .iter()
        .map(|p| p.to_coord().to_normalized(width as f64, height as f64))
        .collect()
}
