#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use blenderline::ir::BinaryMask;
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Builds rendered BlenderLine datasets on disk.
pub struct RenderFixture {
    pub root: PathBuf,
}

impl RenderFixture {
    /// Creates the dataset skeleton with a mapping-style class registry.
    pub fn new(root: &Path, classes: &[(u32, &str)]) -> Self {
        fs::create_dir_all(root.join("images")).expect("create images dir");
        fs::create_dir_all(root.join("annotations")).expect("create annotations dir");
        fs::create_dir_all(root.join("masks")).expect("create masks dir");

        let mut yaml = String::from("names:\n");
        for (id, name) in classes {
            yaml.push_str(&format!("  {}: {}\n", id, name));
        }
        fs::write(root.join("classes.yaml"), yaml).expect("write classes.yaml");

        Self {
            root: root.to_path_buf(),
        }
    }

    /// Writes an image, one mask PNG per instance and the manifest.
    pub fn add_image(&self, key: &str, width: u32, height: u32, instances: &[(u32, BinaryMask)]) {
        let image_path = self.root.join("images").join(format!("{key}.png"));
        write_rgb_png(&image_path, width, height);

        let mut entries = Vec::new();
        for (idx, (class_id, mask)) in instances.iter().enumerate() {
            let rel = format!("{key}/{idx}.png");
            write_mask_png(&self.root.join("masks").join(&rel), mask);
            entries.push(format!(r#"{{"class_id": {class_id}, "mask": "{rel}"}}"#));
        }
        self.write_manifest(key, &format!(r#"{{"instances": [{}]}}"#, entries.join(", ")));
    }

    pub fn write_manifest(&self, key: &str, json: &str) {
        let path = self.root.join("annotations").join(format!("{key}.json"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create manifest dir");
        }
        fs::write(path, json).expect("write manifest");
    }
}

pub fn square_mask(size: u32, lo: u32, hi: u32) -> BinaryMask {
    BinaryMask::from_fn(size, size, |x, y| (lo..hi).contains(&x) && (lo..hi).contains(&y))
}

pub fn write_rgb_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let img = RgbImage::from_pixel(width, height, Rgb([40, 90, 160]));
    img.save(path).expect("write rgb png");
}

pub fn write_mask_png(path: &Path, mask: &BinaryMask) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let img = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get(x as i64, y as i64) { 255 } else { 0 }])
    });
    img.save(path).expect("write mask png");
}

/// Label lines of `<target>/labels/<key>.txt`.
pub fn label_lines(target: &Path, key: &str) -> Vec<String> {
    let path = target.join("labels").join(format!("{key}.txt"));
    fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("read {}: {}", path.display(), err))
        .lines()
        .map(str::to_string)
        .collect()
}
