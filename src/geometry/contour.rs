//! Connected-region extraction and outer boundary tracing.
//!
//! Foreground pixels are grouped into 8-connected components. Each component
//! is traced along the pixel edges that separate it from everything else,
//! giving a ring of pixel-corner vertices with the component on the left of
//! every edge (counter-clockwise on screen, y pointing down).
//!
//! Holes are not reported: a ring-shaped component yields its outer boundary
//! only.

use crate::ir::{BinaryMask, Contour, LatticePoint};

/// One 8-connected foreground region of a mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Outer boundary of the region.
    pub contour: Contour,
    /// Number of foreground pixels in the region.
    pub pixel_count: u64,
}

const NEIGHBOURS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Finds every 8-connected foreground region, in raster order of each
/// region's first pixel. An empty mask yields no fragments.
pub fn extract_fragments(mask: &BinaryMask) -> Vec<Fragment> {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as i64, height as i64);
    let bits = mask.bits();

    // 0 = background or not yet visited.
    let mut labels = vec![0u32; bits.len()];
    let mut next_label = 0u32;
    let mut fragments = Vec::new();
    let mut stack: Vec<(i64, i64)> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if !bits[idx] || labels[idx] != 0 {
                continue;
            }

            next_label += 1;
            labels[idx] = next_label;
            stack.push((x, y));
            let mut pixel_count = 0u64;

            while let Some((px, py)) = stack.pop() {
                pixel_count += 1;
                for (dx, dy) in NEIGHBOURS_8 {
                    let (nx, ny) = (px + dx, py + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = (ny * w + nx) as usize;
                    if bits[nidx] && labels[nidx] == 0 {
                        labels[nidx] = next_label;
                        stack.push((nx, ny));
                    }
                }
            }

            let label = next_label;
            let inside = |cx: i64, cy: i64| {
                cx >= 0 && cy >= 0 && cx < w && cy < h && labels[(cy * w + cx) as usize] == label
            };
            fragments.push(Fragment {
                contour: trace_outer_boundary((x, y), inside),
                pixel_count,
            });
        }
    }

    fragments
}

/// Outer boundaries of every 8-connected region of `mask`.
pub fn find_contours(mask: &BinaryMask) -> Vec<Contour> {
    extract_fragments(mask)
        .into_iter()
        .map(|fragment| fragment.contour)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    #[inline]
    fn step(self, (x, y): (i64, i64)) -> (i64, i64) {
        match self {
            Heading::North => (x, y - 1),
            Heading::East => (x + 1, y),
            Heading::South => (x, y + 1),
            Heading::West => (x - 1, y),
        }
    }

    #[inline]
    fn left(self) -> Self {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }

    #[inline]
    fn right(self) -> Self {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }

    /// Offsets from a vertex to the pixels ahead-left and ahead-right of it.
    #[inline]
    fn ahead(self) -> ((i64, i64), (i64, i64)) {
        match self {
            Heading::South => ((0, 0), (-1, 0)),
            Heading::East => ((0, -1), (0, 0)),
            Heading::North => ((-1, -1), (0, -1)),
            Heading::West => ((-1, 0), (-1, -1)),
        }
    }
}

/// Follows the crack boundary starting at the top-left corner of `first`,
/// which must be the region's first pixel in raster order.
///
/// Right turns take priority so that diagonally touching pixels stay on one
/// boundary, matching 8-connectivity. Only vertices where the heading changes
/// are kept.
fn trace_outer_boundary(first: (i64, i64), inside: impl Fn(i64, i64) -> bool) -> Contour {
    let start = first;
    let mut points = vec![lattice(start)];
    let mut vertex = start;
    let mut heading = Heading::South;

    loop {
        vertex = heading.step(vertex);
        if vertex == start {
            break;
        }

        let ((lx, ly), (rx, ry)) = heading.ahead();
        let next = if inside(vertex.0 + rx, vertex.1 + ry) {
            heading.right()
        } else if inside(vertex.0 + lx, vertex.1 + ly) {
            heading
        } else {
            heading.left()
        };

        if next != heading {
            points.push(lattice(vertex));
            heading = next;
        }
    }

    Contour::new(points)
}

#[inline]
fn lattice((x, y): (i64, i64)) -> LatticePoint {
    // Boundary vertices stay within 0..=width and 0..=height.
    LatticePoint::new(x as u32, y as u32)
}
