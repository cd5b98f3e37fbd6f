//! Mask geometry: region extraction, simplification, filtering and
//! normalization.

pub mod area;
pub mod contour;
pub mod normalize;
pub mod simplify;

pub use area::{area_ratio, passes_min_area, DEFAULT_MIN_AREA};
pub use contour::{extract_fragments, find_contours, Fragment};
pub use normalize::{normalize_box, normalize_polygon};
pub use simplify::{simplify, simplify_with_factor, tolerance_for, DEFAULT_EPS_FACTOR};
