//! `download`: fetches and unpacks a named example project.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::error::BlenderlineError;

/// Environment variable holding the base URL example archives live under.
pub const EXAMPLES_URL_ENV: &str = "BLENDERLINE_EXAMPLES_URL";

/// Example projects that can be downloaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExampleProject {
    #[value(name = "example_beer")]
    ExampleBeer,
}

impl ExampleProject {
    pub fn name(&self) -> &'static str {
        match self {
            ExampleProject::ExampleBeer => "example_beer",
        }
    }

    /// `<base>/<name>.zip`.
    pub fn archive_url(&self, base_url: &str) -> Result<String, BlenderlineError> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let invalid = |message: String| BlenderlineError::Download {
            url: base_url.to_string(),
            message,
        };

        #[cfg(feature = "download")]
        {
            let url = url::Url::parse(&base)
                .and_then(|base| base.join(&format!("{}.zip", self.name())))
                .map_err(|source| invalid(source.to_string()))?;
            Ok(url.to_string())
        }

        #[cfg(not(feature = "download"))]
        {
            if base.contains("://") {
                Ok(format!("{}{}.zip", base, self.name()))
            } else {
                Err(invalid("not an absolute URL".to_string()))
            }
        }
    }
}

/// Options of a `download` run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOptions {
    pub name: ExampleProject,
    pub target: PathBuf,
    pub base_url: String,
}

impl DownloadOptions {
    /// Directory the project is unpacked into.
    pub fn destination(&self) -> PathBuf {
        self.target.join(self.name.name())
    }
}

/// Downloads the example archive and unpacks it into `target/<name>`.
#[cfg(feature = "download")]
pub fn download_example(opts: &DownloadOptions) -> Result<PathBuf, BlenderlineError> {
    use std::fs;
    use std::time::Duration;

    use log::{info, warn};

    let url = opts.name.archive_url(&opts.base_url)?;
    let destination = opts.destination();
    let download_err = |message: String| BlenderlineError::Download {
        url: url.clone(),
        message,
    };

    fs::create_dir_all(&opts.target)?;
    let archive_path = opts.target.join(format!("{}.zip", opts.name.name()));

    info!("Downloading {}", url);
    let config = ureq::Agent::config_builder()
        .timeout_connect(Some(Duration::from_secs(30)))
        .build();
    let agent: ureq::Agent = config.into();
    let mut response = agent
        .get(&url)
        .call()
        .map_err(|source| download_err(source.to_string()))?;

    {
        let mut file = fs::File::create(&archive_path)?;
        std::io::copy(&mut response.body_mut().as_reader(), &mut file)
            .map_err(|source| download_err(source.to_string()))?;
    }

    if is_unpacked(&destination) {
        warn!(
            "{} already exists; existing files will be overwritten",
            destination.display()
        );
    }
    info!("Unpacking into {}", destination.display());
    let unpacked = unpack_archive(&archive_path, &destination);
    discard_archive(&archive_path);
    unpacked.map_err(download_err)?;

    Ok(destination)
}

/// Removes a downloaded archive; a failure only leaves the zip behind.
#[cfg(feature = "download")]
fn discard_archive(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Could not remove archive {}: {}", path.display(), err);
            false
        }
    }
}

#[cfg(not(feature = "download"))]
pub fn download_example(opts: &DownloadOptions) -> Result<PathBuf, BlenderlineError> {
    Err(BlenderlineError::Download {
        url: opts.base_url.clone(),
        message: "this build of blenderline was compiled without the 'download' feature"
            .to_string(),
    })
}

/// Extracts a zip archive, refusing entries that would escape `destination`.
#[cfg(feature = "download")]
pub fn unpack_archive(archive: &Path, destination: &Path) -> Result<(), String> {
    let file = std::fs::File::open(archive).map_err(|source| source.to_string())?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| source.to_string())?;
    zip.extract(destination).map_err(|source| source.to_string())
}

/// Reports whether `path` already holds an unpacked project.
pub fn is_unpacked(path: &Path) -> bool {
    path.is_dir()
        && path
            .read_dir()
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
}
