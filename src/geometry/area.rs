//! Minimum-area filtering of fragments.

/// Default `minarea`: fraction of the image a fragment must cover.
pub const DEFAULT_MIN_AREA: f64 = 0.005;

/// Fraction of the image covered by `pixel_count` pixels.
#[inline]
pub fn area_ratio(pixel_count: u64, image_area: u64) -> f64 {
    if image_area == 0 {
        return 0.0;
    }
    pixel_count as f64 / image_area as f64
}

/// True when the fragment is kept. The threshold itself is inclusive: a
/// ratio exactly equal to `min_area` passes.
#[inline]
pub fn passes_min_area(pixel_count: u64, image_area: u64, min_area: f64) -> bool {
    !(area_ratio(pixel_count, image_area) < min_area)
}
