//! Rendered source dataset: layout discovery, class registry and mask
//! loading.
//!
//! Expected layout:
//!
//! ```text
//! <source>/
//!   classes.yaml                   names: class id -> name
//!   images/<rel>/<stem>.<ext>      rendered pixel data
//!   annotations/<rel>/<stem>.json  {"instances": [{"class_id": 2, "mask": "<rel>/<stem>/0.png"}]}
//!   masks/...                      one binary mask per instance, paths relative to masks/
//! ```

mod loader;
mod registry;

pub use loader::{MaskLoader, MASK_THRESHOLD};
pub use registry::ClassRegistry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::BlenderlineError;
use crate::ir::ImageKey;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];
pub const CLASS_REGISTRY_FILE: &str = "classes.yaml";
pub const MANIFEST_EXTENSION: &str = "json";

/// Resolved directories of a source dataset.
#[derive(Clone, Debug)]
pub struct SourceLayout {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub masks_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub registry_path: PathBuf,
}

impl SourceLayout {
    /// Checks that `root` looks like a rendered dataset.
    pub fn discover(root: &Path) -> Result<Self, BlenderlineError> {
        if !root.is_dir() {
            return Err(BlenderlineError::Config(format!(
                "source '{}' is not a directory",
                root.display()
            )));
        }

        let layout = SourceLayout {
            root: root.to_path_buf(),
            images_dir: root.join("images"),
            masks_dir: root.join("masks"),
            annotations_dir: root.join("annotations"),
            registry_path: root.join(CLASS_REGISTRY_FILE),
        };

        if !layout.images_dir.is_dir() {
            return Err(BlenderlineError::corrupt(
                &layout.images_dir,
                "missing images/ directory",
            ));
        }
        if !layout.annotations_dir.is_dir() {
            return Err(BlenderlineError::corrupt(
                &layout.annotations_dir,
                "missing annotations/ directory",
            ));
        }
        if !layout.registry_path.is_file() {
            return Err(BlenderlineError::corrupt(
                &layout.registry_path,
                "missing class registry",
            ));
        }

        Ok(layout)
    }

    /// Path of the instance manifest belonging to `key`.
    pub fn manifest_path(&self, key: &ImageKey) -> PathBuf {
        self.annotations_dir
            .join(format!("{}.{}", key.as_str(), MANIFEST_EXTENSION))
    }
}

/// A rendered image found under `images/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceImage {
    pub key: ImageKey,
    /// Absolute (or source-rooted) path of the pixel file.
    pub path: PathBuf,
    /// Path relative to `images/`, extension included.
    pub rel_path: String,
}

/// An image whose key collides with an earlier one.
#[derive(Clone, Debug)]
pub struct DuplicateImage {
    pub image: SourceImage,
    pub first: PathBuf,
}

/// A discovered source dataset, ready to be converted.
#[derive(Clone, Debug)]
pub struct SourceDataset {
    pub layout: SourceLayout,
    pub registry: ClassRegistry,
    /// Images in relative-path order.
    pub images: Vec<SourceImage>,
    pub duplicates: Vec<DuplicateImage>,
}

impl SourceDataset {
    /// Discovers the layout, reads the class registry and enumerates images.
    pub fn open(root: &Path) -> Result<Self, BlenderlineError> {
        let layout = SourceLayout::discover(root)?;
        let registry = ClassRegistry::read_yaml(&layout.registry_path)?;
        debug!(
            "Loaded {} class(es) from {}",
            registry.len(),
            layout.registry_path.display()
        );

        let mut files = collect_files_with_extensions(&layout.images_dir, &IMAGE_EXTENSIONS)?;
        files.sort_by_cached_key(|path| rel_string(&layout.images_dir, path));

        let mut seen: BTreeMap<ImageKey, PathBuf> = BTreeMap::new();
        let mut images = Vec::with_capacity(files.len());
        let mut duplicates = Vec::new();

        for path in files {
            let rel_path = rel_string(&layout.images_dir, &path);
            let key = ImageKey::new(rel_string(&layout.images_dir, &path.with_extension("")));
            let image = SourceImage {
                key: key.clone(),
                path: path.clone(),
                rel_path,
            };

            if let Some(first) = seen.get(&key) {
                duplicates.push(DuplicateImage {
                    image,
                    first: first.clone(),
                });
            } else {
                seen.insert(key, path);
                images.push(image);
            }
        }

        Ok(SourceDataset {
            layout,
            registry,
            images,
            duplicates,
        })
    }

    pub fn loader(&self) -> MaskLoader<'_> {
        MaskLoader::new(&self.layout, &self.registry)
    }
}

fn collect_files_with_extensions(
    root: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, BlenderlineError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| {
            BlenderlineError::corrupt(root, format!("failed while traversing directory: {source}"))
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

pub(crate) fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
