//! YOLO label lines and `data.yaml`.

use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{create_parent, output_err};
use crate::error::BlenderlineError;
use crate::ir::{AnnotationRecord, Geometry};
use crate::source::ClassRegistry;

pub(super) const DATA_YAML: &str = "data.yaml";

/// Renders one record as a YOLO label line (no trailing newline).
///
/// Boxes become `class cx cy w h`, polygons `class x1 y1 ... xn yn`, all
/// with six fractional digits.
pub fn render_label_line(record: &AnnotationRecord) -> String {
    let mut line = record.class_id.to_string();
    match &record.geometry {
        Geometry::Box(bbox) => {
            let (cx, cy, w, h) = bbox.to_cxcywh();
            let _ = write!(line, " {:.6} {:.6} {:.6} {:.6}", cx, cy, w, h);
        }
        Geometry::Polygon(points) => {
            for point in points {
                let _ = write!(line, " {:.6} {:.6}", point.x, point.y);
            }
        }
    }
    line
}

/// Writes a label file, one line per record. An empty slice yields an empty
/// file.
pub fn write_label_file(path: &Path, records: &[AnnotationRecord]) -> Result<(), BlenderlineError> {
    create_parent(path)?;
    let file = fs::File::create(path).map_err(|source| output_err(path, source))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", render_label_line(record)).map_err(|source| output_err(path, source))?;
    }
    writer.flush().map_err(|source| output_err(path, source))
}

/// Writes `data.yaml` with a `names:` mapping keyed by class id.
pub fn write_data_yaml(output_root: &Path, registry: &ClassRegistry) -> Result<(), BlenderlineError> {
    let mut yaml = String::from("names:\n");
    for (id, name) in registry.iter() {
        yaml.push_str(&format!("  {}: {}\n", id, yaml_single_quoted(name)));
    }

    let path = output_root.join(DATA_YAML);
    fs::write(&path, yaml).map_err(|source| output_err(&path, source))
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}
