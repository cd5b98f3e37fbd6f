#![allow(dead_code)]

use std::collections::VecDeque;

use blenderline::ir::BinaryMask;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(128);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 2048;
    config
}

/// Random masks up to `max_w` x `max_h`, foreground with probability `density`.
pub fn arb_mask(max_w: u32, max_h: u32, density: f64) -> impl Strategy<Value = BinaryMask> {
    (1..=max_w, 1..=max_h).prop_flat_map(move |(w, h)| {
        prop::collection::vec(prop::bool::weighted(density), (w * h) as usize).prop_map(
            move |bits| BinaryMask::from_fn(w, h, |x, y| bits[(y * w + x) as usize]),
        )
    })
}

/// Sizes of the 8-connected foreground components, in raster order of their
/// first pixel. Plain breadth-first search, kept independent of the crate.
pub fn component_sizes(mask: &BinaryMask) -> Vec<u64> {
    let (w, h) = (mask.width() as i64, mask.height() as i64);
    let mut seen = vec![false; (w * h) as usize];
    let mut sizes = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if seen[idx] || !mask.get(x, y) {
                continue;
            }
            seen[idx] = true;
            let mut queue = VecDeque::from([(x, y)]);
            let mut size = 0u64;
            while let Some((cx, cy)) = queue.pop_front() {
                size += 1;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (cx + dx, cy + dy);
                        if (dx, dy) == (0, 0) || nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let nidx = (ny * w + nx) as usize;
                        if !seen[nidx] && mask.get(nx, ny) {
                            seen[nidx] = true;
                            queue.push_back((nx, ny));
                        }
                    }
                }
            }
            sizes.push(size);
        }
    }

    sizes
}
