//! Format emitter: writes copied images, per-image label files and
//! `data.yaml` into the output dataset.
//!
//! ```text
//! <target>/
//!   images/<rel>/<stem>.<ext>
//!   labels/<rel>/<stem>.txt
//!   data.yaml
//!   .incomplete      present until the run completes
//! ```

mod yolo;

pub use yolo::{render_label_line, write_data_yaml, write_label_file};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::warn;
use serde::Serialize;

use crate::error::BlenderlineError;
use crate::ir::{AnnotationRecord, ImageKey};
use crate::source::SourceImage;

pub const LABEL_EXTENSION: &str = "txt";
pub const INCOMPLETE_MARKER: &str = ".incomplete";

/// Target label format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `class cx cy w h` per fragment.
    #[value(name = "yolo_detection", alias = "detection")]
    YoloDetection,
    /// `class x1 y1 ... xn yn` per fragment.
    #[value(name = "yolo_segmentation", alias = "segmentation")]
    YoloSegmentation,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::YoloDetection => "yolo_detection",
            OutputFormat::YoloSegmentation => "yolo_segmentation",
        }
    }

    /// Whether fragments are emitted as polygons (and therefore simplified).
    pub fn is_segmentation(&self) -> bool {
        matches!(self, OutputFormat::YoloSegmentation)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved directories of an output dataset.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            images_dir: root.join("images"),
            labels_dir: root.join("labels"),
        }
    }

    /// Creates a fresh output tree and marks it incomplete.
    ///
    /// Existing `images/` and `labels/` directories are replaced; anything
    /// else under the target root is left alone.
    pub fn prepare(root: &Path) -> Result<Self, BlenderlineError> {
        let layout = Self::new(root);
        fs::create_dir_all(&layout.root).map_err(|source| output_err(&layout.root, source))?;
        fs::write(layout.marker_path(), b"").map_err(|source| output_err(&layout.marker_path(), source))?;

        // Stale data.yaml from an earlier run must not outlive the new labels.
        let data_yaml = layout.root.join(yolo::DATA_YAML);
        if data_yaml.is_file() {
            fs::remove_file(&data_yaml).map_err(|source| output_err(&data_yaml, source))?;
        }

        recreate_dir(&layout.images_dir)?;
        recreate_dir(&layout.labels_dir)?;
        Ok(layout)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.root.join(INCOMPLETE_MARKER)
    }

    pub fn is_incomplete(&self) -> bool {
        self.marker_path().exists()
    }

    pub fn label_path(&self, key: &ImageKey) -> PathBuf {
        self.labels_dir
            .join(format!("{}.{}", key.as_str(), LABEL_EXTENSION))
    }

    pub fn image_path(&self, image: &SourceImage) -> PathBuf {
        self.images_dir.join(&image.rel_path)
    }

    /// Copies the image payload and writes its label file.
    ///
    /// Each image owns distinct output paths, so calls for different images
    /// may run concurrently.
    pub fn emit_image(
        &self,
        image: &SourceImage,
        records: &[AnnotationRecord],
    ) -> Result<(), BlenderlineError> {
        copy_image(&image.path, &self.image_path(image))?;
        write_label_file(&self.label_path(&image.key), records)
    }

    /// Writes `data.yaml` and clears the incomplete marker.
    pub fn finish(&self, registry: &crate::source::ClassRegistry) -> Result<(), BlenderlineError> {
        write_data_yaml(&self.root, registry)?;
        let marker = self.marker_path();
        fs::remove_file(&marker).map_err(|source| output_err(&marker, source))
    }
}

/// Copies an image byte for byte, creating parent directories.
pub fn copy_image(src: &Path, dst: &Path) -> Result<u64, BlenderlineError> {
    create_parent(dst)?;
    fs::copy(src, dst).map_err(|source| output_err(dst, source))
}

pub(crate) fn create_parent(path: &Path) -> Result<(), BlenderlineError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|source| output_err(parent, source)),
        None => Ok(()),
    }
}

fn recreate_dir(path: &Path) -> Result<(), BlenderlineError> {
    if path.exists() {
        warn!(
            "Directory {:?} already exists. Deleting and recreating it.",
            path
        );
        fs::remove_dir_all(path).map_err(|source| output_err(path, source))?;
    }
    fs::create_dir_all(path).map_err(|source| output_err(path, source))
}

pub(crate) fn output_err(path: &Path, source: std::io::Error) -> BlenderlineError {
    BlenderlineError::OutputWrite {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BBoxXYXY, ClassId, Geometry};
    use crate::source::ClassRegistry;

    fn source_image(root: &Path, rel: &str) -> SourceImage {
        let path = root.join("src/images").join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("create source dir");
        fs::write(&path, b"not really a png").expect("write image");
        let key = Path::new(rel).with_extension("");
        SourceImage {
            key: ImageKey::new(key.to_string_lossy()),
            path,
            rel_path: rel.to_string(),
        }
    }

    #[test]
    fn output_format_names() {
        assert_eq!(OutputFormat::YoloDetection.to_string(), "yolo_detection");
        assert!(OutputFormat::YoloSegmentation.is_segmentation());
        let parsed = OutputFormat::from_str("segmentation", false).expect("alias");
        assert_eq!(parsed, OutputFormat::YoloSegmentation);
    }

    #[test]
    fn prepare_marks_output_incomplete_and_replaces_old_labels() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let root = temp.path().join("out");
        fs::create_dir_all(root.join("labels")).expect("create labels");
        fs::write(root.join("labels/stale.txt"), "0 0.5 0.5 0.1 0.1\n").expect("write stale");
        fs::write(root.join("notes.md"), "keep me").expect("write notes");

        let layout = OutputLayout::prepare(&root).expect("prepare");
        assert!(layout.is_incomplete());
        assert!(!root.join("labels/stale.txt").exists());
        assert!(root.join("notes.md").exists());
        assert!(layout.images_dir.is_dir());
    }

    #[test]
    fn emit_image_copies_payload_and_writes_empty_label() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = source_image(temp.path(), "train/0001.png");
        let layout = OutputLayout::prepare(&temp.path().join("out")).expect("prepare");

        layout.emit_image(&image, &[]).expect("emit");

        let copied = fs::read(layout.images_dir.join("train/0001.png")).expect("read copy");
        assert_eq!(copied, b"not really a png");
        let label = fs::read_to_string(layout.labels_dir.join("train/0001.txt")).expect("read label");
        assert!(label.is_empty());
    }

    #[test]
    fn finish_writes_data_yaml_and_clears_marker() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = source_image(temp.path(), "0001.png");
        let layout = OutputLayout::prepare(&temp.path().join("out")).expect("prepare");
        let record = AnnotationRecord {
            class_id: ClassId(0),
            geometry: Geometry::Box(BBoxXYXY::from_xyxy(0.0, 0.0, 1.0, 1.0)),
        };
        layout.emit_image(&image, &[record]).expect("emit");

        let registry = ClassRegistry::from_names(["bottle"]);
        layout.finish(&registry).expect("finish");

        assert!(!layout.is_incomplete());
        let yaml = fs::read_to_string(layout.root.join("data.yaml")).expect("read yaml");
        assert_eq!(yaml, "names:\n  0: 'bottle'\n");
    }
}
