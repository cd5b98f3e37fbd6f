//! `generate`: runs the external Blender renderer that produces a source
//! dataset.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::info;
use serde::Deserialize;

use crate::error::BlenderlineError;

/// Script run inside Blender when the config does not name one.
pub const DEFAULT_RENDER_SCRIPT: &str = "render.py";

/// Options of a `generate` run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    pub config: PathBuf,
    pub target: PathBuf,
    /// Folder containing the Blender executable; `PATH` lookup when unset.
    pub blender: Option<PathBuf>,
}

/// The only config key the CLI reads itself; the renderer owns the rest.
#[derive(Debug, Default, Deserialize)]
struct RenderConfig {
    #[serde(default)]
    render_script: Option<PathBuf>,
}

/// Blender executable inside `dir`, or the bare name for `PATH` lookup.
pub fn blender_executable(dir: Option<&Path>) -> PathBuf {
    let name = format!("blender{}", std::env::consts::EXE_SUFFIX);
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Builds the renderer invocation without running it.
pub fn render_command(opts: &GenerateOptions) -> Result<Command, BlenderlineError> {
    if !opts.config.is_file() {
        return Err(BlenderlineError::Config(format!(
            "config file '{}' does not exist",
            opts.config.display()
        )));
    }
    let config = std::path::absolute(&opts.config)?;
    let target = std::path::absolute(&opts.target)?;
    let script = render_script(&config)?;

    let executable = blender_executable(opts.blender.as_deref());
    if opts.blender.is_some() && !executable.is_file() {
        return Err(BlenderlineError::RendererNotFound { path: executable });
    }

    let mut command = Command::new(&executable);
    command
        .arg("--background")
        .arg("--python-exit-code")
        .arg("1")
        .arg("--python")
        .arg(script)
        .arg("--")
        .arg("--config")
        .arg(config)
        .arg("--target")
        .arg(target);
    Ok(command)
}

/// Renders a dataset into `opts.target`, waiting for Blender to exit.
pub fn generate_dataset(opts: &GenerateOptions) -> Result<(), BlenderlineError> {
    let mut command = render_command(opts)?;
    fs::create_dir_all(&opts.target)?;

    info!(
        "Rendering {} into {}",
        opts.config.display(),
        opts.target.display()
    );
    let status = command
        .stdin(Stdio::null())
        .status()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => BlenderlineError::RendererNotFound {
                path: PathBuf::from(command.get_program()),
            },
            _ => BlenderlineError::Io(err),
        })?;

    if !status.success() {
        return Err(BlenderlineError::RenderFailed { status });
    }
    info!("Rendering finished");
    Ok(())
}

/// Resolves the render script named by the config, relative to the config's
/// directory.
fn render_script(config: &Path) -> Result<PathBuf, BlenderlineError> {
    let data = fs::read_to_string(config)?;
    let is_json = config
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed: RenderConfig = if data.trim().is_empty() {
        RenderConfig::default()
    } else if is_json {
        serde_json::from_str(&data)
            .map_err(|source| config_parse_err(config, source.to_string()))?
    } else {
        serde_yaml::from_str(&data)
            .map_err(|source| config_parse_err(config, source.to_string()))?
    };

    let script = parsed
        .render_script
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDER_SCRIPT));
    let base = config.parent().unwrap_or_else(|| Path::new("."));
    Ok(base.join(script))
}

fn config_parse_err(path: &Path, message: String) -> BlenderlineError {
    BlenderlineError::Config(format!("cannot parse '{}': {}", path.display(), message))
}
