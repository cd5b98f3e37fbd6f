//! Per-image annotation: instances in, YOLO records out.
//!
//! Pure with respect to the filesystem, so the orchestrator can run it for
//! many images at once.

use log::debug;

use crate::emit::OutputFormat;
use crate::geometry::{
    area_ratio, extract_fragments, normalize_box, normalize_polygon, passes_min_area,
    simplify_with_factor, DEFAULT_EPS_FACTOR, DEFAULT_MIN_AREA,
};
use crate::ir::{AnnotationRecord, FragmentCounts, Geometry, LoadedImage};

/// Knobs that shape the records of a single image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnnotateParams {
    pub format: OutputFormat,
    pub min_area: f64,
    pub eps_factor: f64,
}

impl Default for AnnotateParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::YoloDetection,
            min_area: DEFAULT_MIN_AREA,
            eps_factor: DEFAULT_EPS_FACTOR,
        }
    }
}

/// Builds the annotation records of `image`.
///
/// Records follow manifest order, then raster order of each instance's
/// fragments. Empty masks and fragments below `min_area` are dropped and
/// only counted.
pub fn annotate_image(
    image: &LoadedImage,
    params: &AnnotateParams,
) -> (Vec<AnnotationRecord>, FragmentCounts) {
    let mut records = Vec::new();
    let mut counts = FragmentCounts {
        instances: image.instances.len(),
        ..Default::default()
    };
    let image_area = image.area();

    for (idx, instance) in image.instances.iter().enumerate() {
        let fragments = extract_fragments(&instance.mask);
        if fragments.is_empty() {
            debug!("{}: instance {} has an empty mask, skipping", image.key, idx);
            counts.empty_masks += 1;
            continue;
        }

        for fragment in fragments {
            if !passes_min_area(fragment.pixel_count, image_area, params.min_area) {
                debug!(
                    "{}: dropping fragment of instance {} (area ratio {:.6} < {})",
                    image.key,
                    idx,
                    area_ratio(fragment.pixel_count, image_area),
                    params.min_area
                );
                counts.below_min_area += 1;
                continue;
            }

            let geometry = match params.format {
                OutputFormat::YoloDetection => {
                    match normalize_box(&fragment.contour, image.width, image.height) {
                        Some(bbox) => Geometry::Box(bbox),
                        None => continue,
                    }
                }
                OutputFormat::YoloSegmentation => {
                    let simplified = simplify_with_factor(&fragment.contour, params.eps_factor);
                    Geometry::Polygon(normalize_polygon(&simplified, image.width, image.height))
                }
            };

            records.push(AnnotationRecord {
                class_id: instance.class_id,
                geometry,
            });
            counts.emitted += 1;
        }
    }

    (records, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::render_label_line;
    use crate::ir::{BinaryMask, ClassId, ImageKey, Instance};

    fn square_image(size: u32, lo: u32, hi: u32) -> LoadedImage {
        let mask = BinaryMask::from_fn(size, size, |x, y| {
            (lo..hi).contains(&x) && (lo..hi).contains(&y)
        });
        LoadedImage {
            key: ImageKey::new("square"),
            width: size,
            height: size,
            instances: vec![Instance::new(2u32, mask)],
        }
    }

    #[test]
    fn detection_of_centered_square() {
        let (records, counts) = annotate_image(&square_image(100, 25, 75), &AnnotateParams::default());
        assert_eq!(records.len(), 1);
        assert_eq!(
            render_label_line(&records[0]),
            "2 0.500000 0.500000 0.500000 0.500000"
        );
        assert_eq!(counts.emitted, 1);
    }

    #[test]
    fn segmentation_reduces_square_to_corners() {
        let params = AnnotateParams {
            format: OutputFormat::YoloSegmentation,
            eps_factor: 1.0,
            ..Default::default()
        };
        let (records, _) = annotate_image(&square_image(100, 25, 75), &params);
        assert_eq!(
            render_label_line(&records[0]),
            "2 0.250000 0.250000 0.250000 0.750000 0.750000 0.750000 0.750000 0.250000"
        );
    }

    #[test]
    fn single_pixel_in_large_image_is_filtered() {
        let mut mask = BinaryMask::new(1000, 1000);
        mask.set(500, 500, true);
        let image = LoadedImage {
            key: ImageKey::new("speck"),
            width: 1000,
            height: 1000,
            instances: vec![Instance::new(0u32, mask)],
        };
        let (records, counts) = annotate_image(&image, &AnnotateParams::default());
        assert!(records.is_empty());
        assert_eq!(counts.below_min_area, 1);
    }

    #[test]
    fn fragment_exactly_at_threshold_is_kept() {
        // 5 of 1000 pixels = 0.005.
        let mask = BinaryMask::from_fn(100, 10, |x, y| y == 0 && x < 5);
        let image = LoadedImage {
            key: ImageKey::new("edge"),
            width: 100,
            height: 10,
            instances: vec![Instance::new(1u32, mask)],
        };
        let (records, _) = annotate_image(&image, &AnnotateParams::default());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn split_instance_yields_one_record_per_fragment() {
        let mask = BinaryMask::from_fn(100, 100, |x, y| y < 20 && (x < 20 || x >= 80));
        let image = LoadedImage {
            key: ImageKey::new("split"),
            width: 100,
            height: 100,
            instances: vec![Instance::new(3u32, mask)],
        };
        let (records, counts) = annotate_image(&image, &AnnotateParams::default());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.class_id == ClassId(3)));
        assert_eq!(counts.emitted, 2);
    }

    #[test]
    fn empty_mask_is_counted_not_emitted() {
        let image = LoadedImage {
            key: ImageKey::new("empty"),
            width: 10,
            height: 10,
            instances: vec![Instance::new(0u32, BinaryMask::new(10, 10))],
        };
        let (records, counts) = annotate_image(&image, &AnnotateParams::default());
        assert!(records.is_empty());
        assert_eq!(counts.empty_masks, 1);
        assert_eq!(counts.instances, 1);
    }
}
