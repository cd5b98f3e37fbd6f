use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

use crate::conversion::ConversionReport;

/// The main error type for blenderline operations.
#[derive(Debug, Error)]
pub enum BlenderlineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Corrupt dataset at {path}: {message}")]
    DatasetCorrupt { path: PathBuf, message: String },

    #[error("Failed to parse class registry {path}: {source}")]
    ClassRegistryParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse instance manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode mask {path}: {source}")]
    MaskDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion failed: {} image(s) could not be converted", .report.failed_images())]
    ConversionFailed { report: Box<ConversionReport> },

    #[error("Conversion cancelled; output left incomplete")]
    Cancelled,

    #[error("Blender executable not found at {path}")]
    RendererNotFound { path: PathBuf },

    #[error("Renderer exited with {status}")]
    RenderFailed { status: ExitStatus },

    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },
}

/// Coarse error taxonomy used in diagnostics and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    Config,
    DatasetCorrupt,
    Io,
    Cancelled,
    Renderer,
    Download,
}

impl BlenderlineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlenderlineError::Config(_) => ErrorKind::Config,
            BlenderlineError::DatasetCorrupt { .. }
            | BlenderlineError::ClassRegistryParse { .. }
            | BlenderlineError::ManifestParse { .. }
            | BlenderlineError::MaskDecode { .. }
            | BlenderlineError::ImageDimensionRead { .. } => ErrorKind::DatasetCorrupt,
            BlenderlineError::ConversionFailed { report } => report.failure_kind(),
            BlenderlineError::Io(_) | BlenderlineError::OutputWrite { .. } => ErrorKind::Io,
            BlenderlineError::Cancelled => ErrorKind::Cancelled,
            BlenderlineError::RendererNotFound { .. } | BlenderlineError::RenderFailed { .. } => {
                ErrorKind::Renderer
            }
            BlenderlineError::Download { .. } => ErrorKind::Download,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BlenderlineError::DatasetCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }
}
