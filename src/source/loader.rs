//! Per-image instance loading.

use std::fs;
use std::path::{Component, Path, PathBuf};

use image::ImageReader;
use serde::Deserialize;

use super::{ClassRegistry, SourceImage, SourceLayout};
use crate::error::BlenderlineError;
use crate::ir::{BinaryMask, ClassId, Instance, LoadedImage};

/// Luma values strictly above this count as occupied.
pub const MASK_THRESHOLD: u8 = 127;

#[derive(Debug, Deserialize)]
struct InstanceManifest {
    #[serde(default)]
    instances: Vec<ManifestInstance>,
}

#[derive(Debug, Deserialize)]
struct ManifestInstance {
    class_id: u32,
    /// Relative to `masks/`.
    mask: PathBuf,
}

/// Reads an image's instances and checks them against the image and the
/// class registry. Read-only.
#[derive(Clone, Copy, Debug)]
pub struct MaskLoader<'a> {
    layout: &'a SourceLayout,
    registry: &'a ClassRegistry,
}

impl<'a> MaskLoader<'a> {
    pub fn new(layout: &'a SourceLayout, registry: &'a ClassRegistry) -> Self {
        Self { layout, registry }
    }

    /// Loads every instance of `image`, in manifest order.
    pub fn load(&self, image: &SourceImage) -> Result<LoadedImage, BlenderlineError> {
        let (width, height) = read_image_dimensions(&image.path)?;

        let manifest_path = self.layout.manifest_path(&image.key);
        let manifest = read_manifest(&manifest_path)?;

        let mut instances = Vec::with_capacity(manifest.instances.len());
        for (idx, entry) in manifest.instances.into_iter().enumerate() {
            let class_id = ClassId::new(entry.class_id);
            if !self.registry.contains(class_id) {
                return Err(BlenderlineError::corrupt(
                    &manifest_path,
                    format!("instance {idx} references unknown class id {class_id}"),
                ));
            }

            if !is_plain_relative(&entry.mask) {
                return Err(BlenderlineError::corrupt(
                    &manifest_path,
                    format!(
                        "instance {idx} mask path '{}' must stay inside masks/",
                        entry.mask.display()
                    ),
                ));
            }
            let mask_path = self.layout.masks_dir.join(&entry.mask);
            let mask = read_mask(&mask_path)?;
            if mask.dimensions() != (width, height) {
                return Err(BlenderlineError::corrupt(
                    &mask_path,
                    format!(
                        "mask is {}x{} but image {} is {}x{}",
                        mask.width(),
                        mask.height(),
                        image.key,
                        width,
                        height
                    ),
                ));
            }

            instances.push(Instance::new(class_id, mask));
        }

        Ok(LoadedImage {
            key: image.key.clone(),
            width,
            height,
            instances,
        })
    }
}

/// True for a non-empty path made only of normal components.
fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

fn read_manifest(path: &Path) -> Result<InstanceManifest, BlenderlineError> {
    let data = fs::read_to_string(path).map_err(|source| {
        BlenderlineError::corrupt(path, format!("cannot read instance manifest: {source}"))
    })?;
    serde_json::from_str(&data).map_err(|source| BlenderlineError::ManifestParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes a mask image and binarises it on luma.
pub(crate) fn read_mask(path: &Path) -> Result<BinaryMask, BlenderlineError> {
    let decode_err = |source| BlenderlineError::MaskDecode {
        path: path.to_path_buf(),
        source,
    };

    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| decode_err(image::ImageError::IoError(source)))?
        .decode()
        .map_err(decode_err)?;

    let luma = decoded.to_luma8();
    Ok(BinaryMask::from_fn(luma.width(), luma.height(), |x, y| {
        luma.get_pixel(x, y)[0] > MASK_THRESHOLD
    }))
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), BlenderlineError> {
    let size = imagesize::size(path).map_err(|source| BlenderlineError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| BlenderlineError::corrupt(path, format!("image width {} does not fit in u32", size.width)))?;

    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| BlenderlineError::corrupt(path, format!("image height {} does not fit in u32", size.height)))?;

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ImageKey;
    use image::{GrayImage, Luma};

    fn write_mask(path: &Path, width: u32, height: u32, on: impl Fn(u32, u32) -> bool) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create mask dir");
        }
        let img = GrayImage::from_fn(width, height, |x, y| {
            Luma([if on(x, y) { 255 } else { 0 }])
        });
        img.save(path).expect("save mask png");
    }

    fn setup(root: &Path, manifest: &str, image_size: (u32, u32)) -> (SourceLayout, SourceImage) {
        fs::create_dir_all(root.join("images")).expect("create images dir");
        fs::create_dir_all(root.join("annotations")).expect("create annotations dir");
        fs::write(root.join("classes.yaml"), "names:\n  0: bottle\n  2: can\n").expect("registry");
        let image_path = root.join("images/0001.png");
        write_mask(&image_path, image_size.0, image_size.1, |_, _| false);
        fs::write(root.join("annotations/0001.json"), manifest).expect("write manifest");

        let layout = SourceLayout::discover(root).expect("discover");
        let image = SourceImage {
            key: ImageKey::new("0001"),
            path: image_path,
            rel_path: "0001.png".into(),
        };
        (layout, image)
    }

    #[test]
    fn loads_instances_in_manifest_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let (layout, image) = setup(
            temp.path(),
            r#"{"instances": [{"class_id": 2, "mask": "0001/0.png"}, {"class_id": 0, "mask": "0001/1.png"}]}"#,
            (20, 10),
        );
        write_mask(&temp.path().join("masks/0001/0.png"), 20, 10, |x, _| x < 5);
        write_mask(&temp.path().join("masks/0001/1.png"), 20, 10, |_, _| false);

        let registry = ClassRegistry::read_yaml(&layout.registry_path).expect("registry");
        let loaded = MaskLoader::new(&layout, &registry).load(&image).expect("load");

        assert_eq!((loaded.width, loaded.height), (20, 10));
        assert_eq!(loaded.instances.len(), 2);
        assert_eq!(loaded.instances[0].class_id, ClassId(2));
        assert_eq!(loaded.instances[0].mask.count(), 50);
        assert!(loaded.instances[1].mask.is_empty());
    }

    #[test]
    fn rejects_unknown_class() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let (layout, image) = setup(
            temp.path(),
            r#"{"instances": [{"class_id": 1, "mask": "0001/0.png"}]}"#,
            (4, 4),
        );
        write_mask(&temp.path().join("masks/0001/0.png"), 4, 4, |_, _| true);

        let registry = ClassRegistry::read_yaml(&layout.registry_path).expect("registry");
        let err = MaskLoader::new(&layout, &registry).load(&image).unwrap_err();
        assert!(matches!(err, BlenderlineError::DatasetCorrupt { .. }));
        assert!(err.to_string().contains("unknown class id 1"));
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let (layout, image) = setup(
            temp.path(),
            r#"{"instances": [{"class_id": 0, "mask": "0001/0.png"}]}"#,
            (8, 8),
        );
        write_mask(&temp.path().join("masks/0001/0.png"), 8, 9, |_, _| true);

        let registry = ClassRegistry::read_yaml(&layout.registry_path).expect("registry");
        let err = MaskLoader::new(&layout, &registry).load(&image).unwrap_err();
        assert!(err.to_string().contains("mask is 8x9"));
    }

    #[test]
    fn missing_mask_is_a_decode_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let (layout, image) = setup(
            temp.path(),
            r#"{"instances": [{"class_id": 0, "mask": "0001/missing.png"}]}"#,
            (8, 8),
        );

        let registry = ClassRegistry::read_yaml(&layout.registry_path).expect("registry");
        let err = MaskLoader::new(&layout, &registry).load(&image).unwrap_err();
        assert!(matches!(err, BlenderlineError::MaskDecode { .. }));
    }

    #[test]
    fn rejects_mask_paths_outside_masks_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        write_mask(&temp.path().join("outside.png"), 8, 8, |_, _| true);
        let outside = temp.path().join("outside.png");

        for mask in ["../outside.png", "0001/../../outside.png", outside.to_str().expect("utf-8 path"), ""] {
            let manifest = serde_json::json!({"instances": [{"class_id": 0, "mask": mask}]});
            let (layout, image) = setup(temp.path(), &manifest.to_string(), (8, 8));

            let registry = ClassRegistry::read_yaml(&layout.registry_path).expect("registry");
            let err = MaskLoader::new(&layout, &registry).load(&image).unwrap_err();
            assert!(matches!(err, BlenderlineError::DatasetCorrupt { .. }), "{mask}: {err}");
            assert!(err.to_string().contains("must stay inside masks/"), "{mask}: {err}");
        }
    }

    #[test]
    fn malformed_manifest_is_reported() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let (layout, image) = setup(temp.path(), "{not json", (8, 8));

        let registry = ClassRegistry::read_yaml(&layout.registry_path).expect("registry");
        let err = MaskLoader::new(&layout, &registry).load(&image).unwrap_err();
        assert!(matches!(err, BlenderlineError::ManifestParse { .. }));
    }
}
