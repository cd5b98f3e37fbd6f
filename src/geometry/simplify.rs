//! Perimeter-proportional Douglas–Peucker simplification of closed contours.
//!
//! The vertices that are extremal along the eight compass and diagonal
//! directions are pinned as anchors, then every chain between consecutive
//! anchors is simplified independently. Pinning keeps the fragment's
//! bounding box intact and makes the result stable: simplifying an already
//! simplified contour with the same tolerance returns it unchanged.

use crate::ir::{Contour, LatticePoint};

/// Default `eps_factor`: tolerance as a fraction of the contour perimeter.
pub const DEFAULT_EPS_FACTOR: f64 = 0.005;

/// Absolute tolerance for `contour` given a perimeter-relative factor.
pub fn tolerance_for(contour: &Contour, eps_factor: f64) -> f64 {
    eps_factor * contour.perimeter()
}

/// Simplifies with `tolerance = eps_factor * perimeter(contour)`.
pub fn simplify_with_factor(contour: &Contour, eps_factor: f64) -> Contour {
    simplify(contour, tolerance_for(contour, eps_factor))
}

/// Simplifies `contour`, keeping every vertex whose perpendicular deviation
/// from its chain's chord exceeds `tolerance`.
///
/// A tolerance of zero (or anything not strictly positive) returns the
/// contour unchanged. The result never has fewer than three vertices unless
/// the input already did.
pub fn simplify(contour: &Contour, tolerance: f64) -> Contour {
    let n = contour.len();
    if !(tolerance > 0.0) || n <= 3 {
        return contour.clone();
    }

    let points = &contour.points;
    let anchors = extremal_anchors(points);

    let mut keep = vec![false; n];
    for &anchor in &anchors {
        keep[anchor] = true;
    }

    for (i, &from) in anchors.iter().enumerate() {
        let to = anchors[(i + 1) % anchors.len()];
        let span = if to > from { to - from } else { to + n - from };
        let chain: Vec<usize> = (0..=span).map(|k| (from + k) % n).collect();
        douglas_peucker(points, &chain, tolerance, &mut keep);
    }

    let simplified: Vec<LatticePoint> = points
        .iter()
        .zip(&keep)
        .filter_map(|(&p, &kept)| kept.then_some(p))
        .collect();

    if simplified.len() < 3 {
        return contour.clone();
    }
    Contour::new(simplified)
}

/// Indices of the first vertex maximising each of x, -x, y, -y, x+y,
/// -(x+y), x-y and y-x; sorted and deduplicated.
fn extremal_anchors(points: &[LatticePoint]) -> Vec<usize> {
    let keys: [fn(i64, i64) -> i64; 8] = [
        |x, _| x,
        |x, _| -x,
        |_, y| y,
        |_, y| -y,
        |x, y| x + y,
        |x, y| -(x + y),
        |x, y| x - y,
        |x, y| y - x,
    ];

    let mut anchors: Vec<usize> = keys
        .iter()
        .map(|key| {
            let mut best = 0;
            let mut best_value = i64::MIN;
            for (idx, p) in points.iter().enumerate() {
                let value = key(p.x as i64, p.y as i64);
                if value > best_value {
                    best_value = value;
                    best = idx;
                }
            }
            best
        })
        .collect();
    anchors.sort_unstable();
    anchors.dedup();
    anchors
}

fn douglas_peucker(points: &[LatticePoint], chain: &[usize], tolerance: f64, keep: &mut [bool]) {
    if chain.len() < 3 {
        return;
    }

    let first = points[chain[0]];
    let last = points[chain[chain.len() - 1]];

    let mut split = 0;
    let mut max_deviation = 0.0;
    for (pos, &idx) in chain.iter().enumerate().take(chain.len() - 1).skip(1) {
        let deviation = perpendicular_distance(points[idx], first, last);
        if deviation > max_deviation {
            max_deviation = deviation;
            split = pos;
        }
    }

    if max_deviation > tolerance {
        keep[chain[split]] = true;
        douglas_peucker(points, &chain[..=split], tolerance, keep);
        douglas_peucker(points, &chain[split..], tolerance, keep);
    }
}

/// Distance from `p` to the line through `a` and `b`, or to `a` when the two
/// coincide.
fn perpendicular_distance(p: LatticePoint, a: LatticePoint, b: LatticePoint) -> f64 {
    let (px, py) = (p.x as f64, p.y as f64);
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return (px - ax).hypot(py - ay);
    }
    (dx * (ay - py) - dy * (ax - px)).abs() / length
}
