//! Structured summary of a conversion run.
//!
//! Per-image failures are collected here instead of aborting the run, so one
//! report lists every offending image.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::emit::OutputFormat;
use crate::error::ErrorKind;
use crate::ir::FragmentCounts;

/// Where a run ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    InProgress,
    Completed,
    Failed,
}

/// Summary of one `convert` run.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionReport {
    pub format: OutputFormat,
    pub source: PathBuf,
    pub target: PathBuf,
    pub outcome: RunOutcome,
    pub counts: ConversionCounts,
    /// One entry per image that could not be converted.
    pub issues: Vec<ConversionIssue>,
    /// Set once the source dataset has been deleted (`--remove`).
    pub source_removed: bool,
}

impl ConversionReport {
    pub fn new(format: OutputFormat, source: &Path, target: &Path) -> Self {
        Self {
            format,
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            outcome: RunOutcome::InProgress,
            counts: ConversionCounts::default(),
            issues: Vec::new(),
            source_removed: false,
        }
    }

    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    /// Number of distinct images with at least one issue.
    pub fn failed_images(&self) -> usize {
        self.issues
            .iter()
            .map(|issue| issue.image.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn has_failures(&self) -> bool {
        !self.issues.is_empty()
    }

    /// The most severe error kind among the issues.
    ///
    /// Output write failures are fatal for the whole run, so they win over
    /// per-image corruption.
    pub fn failure_kind(&self) -> ErrorKind {
        if self.issues.iter().any(|issue| issue.kind == ErrorKind::Io) {
            ErrorKind::Io
        } else {
            ErrorKind::DatasetCorrupt
        }
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Converted {}/{} images to {} ({} -> {})",
            self.counts.converted,
            self.counts.images,
            self.format,
            self.source.display(),
            self.target.display()
        )?;
        let fragments = &self.counts.fragments;
        writeln!(
            f,
            "  {} instances, {} fragments emitted, {} below min area, {} empty masks",
            fragments.instances, fragments.emitted, fragments.below_min_area, fragments.empty_masks
        )?;
        if self.counts.skipped > 0 {
            writeln!(f, "  {} images skipped", self.counts.skipped)?;
        }
        if self.source_removed {
            writeln!(f, "  source dataset removed")?;
        }

        if !self.issues.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed images ({}):", self.failed_images())?;
            for issue in &self.issues {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Image and fragment totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    /// Images discovered in the source dataset.
    pub images: usize,
    /// Images whose label file was written.
    pub converted: usize,
    /// Images not attempted because the run stopped early.
    pub skipped: usize,
    #[serde(flatten)]
    pub fragments: FragmentCounts,
}

/// A single image that could not be converted.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub code: ConversionIssueCode,
    pub kind: ErrorKind,
    /// Image identifier (path under `images/` without extension).
    pub image: String,
    pub message: String,
}

impl ConversionIssue {
    pub fn new(
        code: ConversionIssueCode,
        kind: ErrorKind,
        image: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            kind,
            image: image.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{:?}]: {}", self.image, self.kind, self.message)
    }
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// Unreadable file, bad manifest, dimension mismatch or unknown class.
    CorruptImage,
    /// Another image already claimed this identifier.
    DuplicateImage,
    /// Writing the label file or image copy failed.
    OutputWrite,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ConversionReport {
        ConversionReport::new(
            OutputFormat::YoloDetection,
            Path::new("/data/render"),
            Path::new("/data/yolo"),
        )
    }

    #[test]
    fn failed_images_counts_distinct_keys() {
        let mut report = report();
        report.add(ConversionIssue::new(
            ConversionIssueCode::CorruptImage,
            ErrorKind::DatasetCorrupt,
            "a",
            "bad mask",
        ));
        report.add(ConversionIssue::new(
            ConversionIssueCode::DuplicateImage,
            ErrorKind::DatasetCorrupt,
            "b",
            "duplicate",
        ));
        assert_eq!(report.failed_images(), 2);
        assert_eq!(report.failure_kind(), ErrorKind::DatasetCorrupt);
    }

    #[test]
    fn output_write_dominates_failure_kind() {
        let mut report = report();
        report.add(ConversionIssue::new(
            ConversionIssueCode::CorruptImage,
            ErrorKind::DatasetCorrupt,
            "a",
            "bad mask",
        ));
        report.add(ConversionIssue::new(
            ConversionIssueCode::OutputWrite,
            ErrorKind::Io,
            "b",
            "disk full",
        ));
        assert_eq!(report.failure_kind(), ErrorKind::Io);
    }

    #[test]
    fn display_lists_failed_images() {
        let mut report = report();
        report.counts.images = 2;
        report.counts.converted = 1;
        report.add(ConversionIssue::new(
            ConversionIssueCode::CorruptImage,
            ErrorKind::DatasetCorrupt,
            "train/0002",
            "mask is 8x9 but image train/0002 is 8x8",
        ));
        let text = report.to_string();
        assert!(text.contains("Converted 1/2 images to yolo_detection"));
        assert!(text.contains("Failed images (1):"));
        assert!(text.contains("train/0002 [DatasetCorrupt]"));
    }

    #[test]
    fn json_flattens_fragment_counts() {
        let mut report = report();
        report.counts.fragments.emitted = 3;
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["counts"]["emitted"], 3);
        assert_eq!(json["outcome"], "in_progress");
        assert_eq!(json["format"], "yolo_detection");
    }
}
