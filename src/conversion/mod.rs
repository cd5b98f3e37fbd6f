//! Dataset converter: drives every source image through the mask loader,
//! the geometry pipeline and the emitter.
//!
//! Images are independent, so they are processed on a rayon pool. Corrupt
//! images are recorded and skipped; an output write failure stops the run.
//! The source dataset is removed only after a completed run.

mod pipeline;
pub mod report;

pub use pipeline::{annotate_image, AnnotateParams};
pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, RunOutcome,
};

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;

use crate::emit::{OutputFormat, OutputLayout};
use crate::error::{BlenderlineError, ErrorKind};
use crate::geometry::{DEFAULT_EPS_FACTOR, DEFAULT_MIN_AREA};
use crate::ir::FragmentCounts;
use crate::source::{MaskLoader, SourceDataset, SourceImage};

/// Options of a `convert` run.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    pub format: OutputFormat,
    pub source: PathBuf,
    pub target: PathBuf,
    /// Minimum fraction of the image a fragment must cover.
    pub min_area: f64,
    /// Simplification tolerance as a fraction of the contour perimeter.
    pub eps_factor: f64,
    /// Delete `source` after a completed run.
    pub remove: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::YoloDetection,
            source: PathBuf::new(),
            target: PathBuf::new(),
            min_area: DEFAULT_MIN_AREA,
            eps_factor: DEFAULT_EPS_FACTOR,
            remove: false,
        }
    }
}

impl ConvertOptions {
    pub fn new(format: OutputFormat, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            format,
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn annotate_params(&self) -> AnnotateParams {
        AnnotateParams {
            format: self.format,
            min_area: self.min_area,
            eps_factor: self.eps_factor,
        }
    }

    /// Rejects option combinations that must never touch the filesystem.
    pub fn validate(&self) -> Result<(), BlenderlineError> {
        check_non_negative("minarea", self.min_area)?;
        check_non_negative("eps-factor", self.eps_factor)?;

        if !self.source.is_dir() {
            return Err(BlenderlineError::Config(format!(
                "source '{}' does not exist or is not a directory",
                self.source.display()
            )));
        }

        let source = resolve_path(&self.source)?;
        let target = resolve_path(&self.target)?;

        if source == target {
            return Err(BlenderlineError::Config(
                "source and target must be different directories".to_string(),
            ));
        }
        if self.remove && target.starts_with(&source) {
            return Err(BlenderlineError::Config(format!(
                "--remove would delete the output: target '{}' is inside source '{}'",
                self.target.display(),
                self.source.display()
            )));
        }
        if source.starts_with(target.join("images")) || source.starts_with(target.join("labels")) {
            return Err(BlenderlineError::Config(format!(
                "source '{}' lies inside the output tree of '{}'",
                self.source.display(),
                self.target.display()
            )));
        }

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), BlenderlineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BlenderlineError::Config(format!(
            "--{name} must be a non-negative number, got {value}"
        )))
    }
}

/// Absolute form of `path` with symlinks resolved for the part that exists.
///
/// `..` in the part that does not exist yet is folded lexically, so
/// `render/not_yet/..` resolves to `render`.
fn resolve_path(path: &Path) -> Result<PathBuf, BlenderlineError> {
    let absolute = std::path::absolute(path)?;
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    while !existing.exists() {
        let Some(parent) = existing.parent() else {
            break;
        };
        match existing.components().next_back() {
            Some(component) => rest.push(component.as_os_str().to_os_string()),
            None => break,
        }
        existing = parent;
    }

    let mut resolved = fs::canonicalize(existing).unwrap_or_else(|_| existing.to_path_buf());
    for name in rest.into_iter().rev() {
        match Path::new(&name).components().next() {
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::CurDir) | None => {}
            Some(_) => resolved.push(name),
        }
    }
    Ok(resolved)
}

/// Run-wide cancellation flag, checked before each image.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum ImageOutcome {
    Converted(FragmentCounts),
    Failed(BlenderlineError),
    Skipped,
}

/// Converts a whole source dataset.
///
/// Returns the report of a completed run. A run with any failed image ends
/// in [`BlenderlineError::ConversionFailed`] carrying the full report; a
/// cancelled run ends in [`BlenderlineError::Cancelled`]. In both cases the
/// output keeps its `.incomplete` marker and the source is left untouched.
pub fn convert_dataset(
    opts: &ConvertOptions,
    cancel: &CancelToken,
) -> Result<ConversionReport, BlenderlineError> {
    opts.validate()?;

    let dataset = SourceDataset::open(&opts.source)?;
    info!(
        "Found {} image(s) and {} class(es) in {}",
        dataset.images.len() + dataset.duplicates.len(),
        dataset.registry.len(),
        opts.source.display()
    );

    let layout = OutputLayout::prepare(&opts.target)?;
    let mut report = ConversionReport::new(opts.format, &opts.source, &opts.target);
    report.counts.images = dataset.images.len() + dataset.duplicates.len();

    for dup in &dataset.duplicates {
        let message = format!(
            "{} shares its identifier with {}",
            dup.image.path.display(),
            dup.first.display()
        );
        error!("{}: {}", dup.image.key, message);
        report.add(ConversionIssue::new(
            ConversionIssueCode::DuplicateImage,
            ErrorKind::DatasetCorrupt,
            dup.image.key.as_str(),
            message,
        ));
    }

    let loader = dataset.loader();
    let params = opts.annotate_params();
    if opts.format.is_segmentation() {
        info!(
            "Simplifying contours with eps factor {} (min area {})",
            params.eps_factor, params.min_area
        );
    }
    let pb = create_progress_bar(dataset.images.len() as u64, "Converting");
    let outcomes = run_images(&dataset.images, cancel, &pb, |image| {
        convert_image(&loader, &layout, image, &params)
    });
    pb.finish_and_clear();

    for (image, outcome) in outcomes {
        match outcome {
            ImageOutcome::Converted(counts) => {
                report.counts.converted += 1;
                report.counts.fragments.merge(&counts);
            }
            ImageOutcome::Failed(err) => {
                error!("{}: {}", image.key, err);
                let code = if err.kind() == ErrorKind::Io {
                    ConversionIssueCode::OutputWrite
                } else {
                    ConversionIssueCode::CorruptImage
                };
                report.add(ConversionIssue::new(
                    code,
                    err.kind(),
                    image.key.as_str(),
                    err.to_string(),
                ));
            }
            ImageOutcome::Skipped => report.counts.skipped += 1,
        }
    }

    if cancel.is_cancelled() {
        warn!(
            "Conversion cancelled after {} image(s); {} left incomplete",
            report.counts.converted,
            opts.target.display()
        );
        return Err(BlenderlineError::Cancelled);
    }

    if report.has_failures() {
        report.outcome = RunOutcome::Failed;
        return Err(BlenderlineError::ConversionFailed {
            report: Box::new(report),
        });
    }

    layout.finish(&dataset.registry)?;
    report.outcome = RunOutcome::Completed;
    info!(
        "Wrote {} label file(s) to {}",
        report.counts.converted,
        layout.labels_dir.display()
    );

    if opts.remove {
        info!("Removing source dataset {}", opts.source.display());
        fs::remove_dir_all(&opts.source)?;
        report.source_removed = true;
    }

    Ok(report)
}

/// Runs `convert` over `images` in parallel. Once the run is cancelled or an
/// output write fails, the images not yet started are skipped.
fn run_images<'a, F>(
    images: &'a [SourceImage],
    cancel: &CancelToken,
    pb: &ProgressBar,
    convert: F,
) -> Vec<(&'a SourceImage, ImageOutcome)>
where
    F: Fn(&SourceImage) -> Result<FragmentCounts, BlenderlineError> + Sync,
{
    let abort = AtomicBool::new(false);
    images
        .par_iter()
        .map(|image| {
            let outcome = if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                ImageOutcome::Skipped
            } else {
                match convert(image) {
                    Ok(counts) => ImageOutcome::Converted(counts),
                    Err(err) => {
                        if err.kind() == ErrorKind::Io {
                            abort.store(true, Ordering::SeqCst);
                        }
                        ImageOutcome::Failed(err)
                    }
                }
            };
            pb.inc(1);
            (image, outcome)
        })
        .collect()
}

fn convert_image(
    loader: &MaskLoader<'_>,
    layout: &OutputLayout,
    image: &SourceImage,
    params: &AnnotateParams,
) -> Result<FragmentCounts, BlenderlineError> {
    let loaded = loader.load(image)?;
    let (records, counts) = annotate_image(&loaded, params);
    layout.emit_image(image, &records)?;
    Ok(counts)
}

fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
            label
        ))
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
