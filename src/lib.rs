//! BlenderLine: synthetic production-line datasets for YOLO.
//!
//! The `convert` pipeline turns rendered images with per-object instance
//! masks into YOLO detection or segmentation label files. `generate` drives
//! the Blender renderer that produces those datasets, and `download` fetches
//! example projects.
//!
//! # Modules
//!
//! - [`ir`]: typed geometry and dataset model (masks, contours, boxes)
//! - [`source`]: rendered dataset layout, class registry and mask loading
//! - [`geometry`]: contour extraction, simplification, area filter, normalization
//! - [`emit`]: YOLO label and `data.yaml` writing
//! - [`conversion`]: the dataset converter and its report
//! - [`error`]: error types

pub mod conversion;
pub mod download;
pub mod emit;
pub mod error;
pub mod generate;
pub mod geometry;
pub mod ir;
pub mod source;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

pub use conversion::{convert_dataset, CancelToken, ConversionReport, ConvertOptions};
pub use emit::OutputFormat;
pub use error::{BlenderlineError, ErrorKind};

use download::{DownloadOptions, ExampleProject, EXAMPLES_URL_ENV};
use generate::GenerateOptions;
use geometry::{DEFAULT_EPS_FACTOR, DEFAULT_MIN_AREA};

/// The blenderline CLI application.
#[derive(Parser)]
#[command(name = "blenderline")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download an example BlenderLine project (assets and configuration file).
    Download(DownloadArgs),
    /// Generate a BlenderLine dataset from a configuration file.
    Generate(GenerateArgs),
    /// Convert a BlenderLine dataset to a YOLO dataset.
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
struct DownloadArgs {
    /// Name of the example project.
    #[arg(value_enum)]
    name: ExampleProject,

    /// Where the project is unpacked (a folder named after it is created).
    #[arg(long, default_value = ".")]
    target: PathBuf,

    /// Base URL the example archives are published under.
    #[arg(long, env = EXAMPLES_URL_ENV)]
    base_url: String,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Configuration file of the project to render.
    #[arg(long)]
    config: PathBuf,

    /// Where the dataset is generated.
    #[arg(long, default_value = ".")]
    target: PathBuf,

    /// Folder containing the Blender executable (default: look it up on PATH).
    #[arg(long)]
    blender: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Target dataset format.
    #[arg(long, value_enum)]
    format: OutputFormat,

    /// Rendered BlenderLine dataset to convert.
    #[arg(long)]
    source: PathBuf,

    /// Where the converted dataset is written.
    #[arg(long)]
    target: PathBuf,

    /// Minimum fraction of the image a fragment must cover to be kept.
    #[arg(
        long,
        default_value_t = DEFAULT_MIN_AREA,
        value_parser = parse_non_negative,
        allow_negative_numbers = true
    )]
    minarea: f64,

    /// Simplification tolerance as a fraction of the contour perimeter
    /// (segmentation only; larger values give coarser polygons).
    #[arg(
        long,
        default_value_t = DEFAULT_EPS_FACTOR,
        value_parser = parse_non_negative,
        allow_negative_numbers = true
    )]
    eps_factor: f64,

    /// Delete the source dataset after a successful conversion.
    #[arg(long)]
    remove: bool,

    /// Summary format printed on stdout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn parse_non_negative(s: &str) -> Result<f64, String> {
    match f64::from_str(s) {
        Ok(val) if val.is_finite() && val >= 0.0 => Ok(val),
        _ => Err("value must be a non-negative number".to_string()),
    }
}

/// Run the blenderline CLI.
///
/// This is the entry point called from `main.rs`.
pub fn run() -> Result<(), BlenderlineError> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Download(args)) => run_download(args),
        Some(Commands::Generate(args)) => run_generate(args),
        Some(Commands::Convert(args)) => run_convert(args),
        None => {
            println!("blenderline {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Synthetic production line datasets for YOLO.");
            println!();
            println!("Run 'blenderline --help' for usage information.");
            Ok(())
        }
    }
}

fn run_download(args: DownloadArgs) -> Result<(), BlenderlineError> {
    let opts = DownloadOptions {
        name: args.name,
        target: args.target,
        base_url: args.base_url,
    };
    let destination = download::download_example(&opts)?;
    info!("Example project ready at {}", destination.display());
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<(), BlenderlineError> {
    let opts = GenerateOptions {
        config: args.config,
        target: args.target,
        blender: args.blender,
    };
    generate::generate_dataset(&opts)
}

fn run_convert(args: ConvertArgs) -> Result<(), BlenderlineError> {
    let opts = ConvertOptions {
        format: args.format,
        source: args.source,
        target: args.target,
        min_area: args.minarea,
        eps_factor: args.eps_factor,
        remove: args.remove,
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the images in flight");
        handler_token.cancel();
    }) {
        warn!("Could not install Ctrl-C handler: {}", err);
    }

    match convert_dataset(&opts, &cancel) {
        Ok(report) => print_report(&report, args.report),
        Err(BlenderlineError::ConversionFailed { report }) => {
            if args.report == ReportFormat::Json {
                print_report(&report, args.report)?;
            }
            Err(BlenderlineError::ConversionFailed { report })
        }
        Err(err) => Err(err),
    }
}

fn print_report(report: &ConversionReport, format: ReportFormat) -> Result<(), BlenderlineError> {
    match format {
        ReportFormat::Text => print!("{}", report),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|source| BlenderlineError::Io(source.into()))?;
            println!("{}", json);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn non_negative_parser() {
        assert_eq!(parse_non_negative("0.005"), Ok(0.005));
        assert_eq!(parse_non_negative("0"), Ok(0.0));
        assert!(parse_non_negative("-0.1").is_err());
        assert!(parse_non_negative("inf").is_err());
        assert!(parse_non_negative("abc").is_err());
    }

    #[test]
    fn convert_args_accept_format_aliases() {
        let cli = Cli::try_parse_from([
            "blenderline",
            "convert",
            "--format",
            "segmentation",
            "--source",
            "render",
            "--target",
            "yolo",
            "--eps-factor",
            "1.0",
        ])
        .expect("parse convert args");
        match cli.command {
            Some(Commands::Convert(args)) => {
                assert_eq!(args.format, OutputFormat::YoloSegmentation);
                assert_eq!(args.eps_factor, 1.0);
                assert_eq!(args.minarea, DEFAULT_MIN_AREA);
                assert!(!args.remove);
            }
            _ => panic!("expected convert subcommand"),
        }
    }

    #[test]
    fn convert_args_reject_negative_minarea() {
        let result = Cli::try_parse_from([
            "blenderline",
            "convert",
            "--format",
            "yolo_detection",
            "--source",
            "render",
            "--target",
            "yolo",
            "--minarea",
            "-0.5",
        ]);
        assert!(result.is_err());
    }
}
