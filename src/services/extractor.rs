//! Adapter around the external extraction tool (`yt-dlp`).
//!
//! The tool is treated as a black box: it is invoked with an argument vector,
//! never through a shell, and only its exit status, stdout and stderr are
//! interpreted here.

use crate::models::media::VideoMetadata;
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    process::Output,
};
use thiserror::Error;
use tokio::{fs, process::Command};
use tracing::{debug, warn};

/// Format selector passed to the tool for both download and direct-URL lookups.
const FORMAT_SELECTOR: &str = "best[ext=mp4]/best";

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("extraction tool `{bin}` could not be started: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: io::Error,
    },
    #[error("extraction tool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },
    #[error("extraction tool returned no usable URL: {0:?}")]
    InvalidOutput(String),
    #[error("downloaded file missing at {}", path.display())]
    FileMissing { path: PathBuf },
}

impl ExtractorError {
    /// Diagnostic text surfaced to API clients as `details`.
    ///
    /// For a failed tool run this is the captured stderr.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::ToolFailed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        }
    }
}

pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Capability to turn a social-media post URL into media.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Resolve the post to a direct media URL without downloading it.
    async fn fetch_direct_url(&self, source_url: &str) -> ExtractorResult<String>;

    /// Scrape title, description and duration.
    ///
    /// Output that cannot be parsed yields empty metadata rather than an error.
    async fn fetch_metadata(&self, source_url: &str) -> ExtractorResult<VideoMetadata>;

    /// Download the media to exactly `destination`.
    ///
    /// The parent directory must already exist. Only `destination` itself may
    /// be written; no `.part` files are left behind by the tool.
    async fn download_to_path(&self, source_url: &str, destination: &Path) -> ExtractorResult<()>;
}

/// [`Extractor`] backed by the `yt-dlp` command-line tool.
#[derive(Clone, Debug)]
pub struct YtDlpExtractor {
    bin: String,
}

impl YtDlpExtractor {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Run the tool to completion and fail on a non-zero exit.
    async fn run(&self, args: &[&str]) -> ExtractorResult<Output> {
        debug!(bin = %self.bin, ?args, "running extraction tool");
        let output = Command::new(&self.bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractorError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractorError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn fetch_direct_url(&self, source_url: &str) -> ExtractorResult<String> {
        let output = self
            .run(&["-g", "-f", FORMAT_SELECTOR, "--", source_url])
            .await?;
        parse_direct_url(&String::from_utf8_lossy(&output.stdout))
    }

    async fn fetch_metadata(&self, source_url: &str) -> ExtractorResult<VideoMetadata> {
        let output = self
            .run(&["--dump-json", "--no-download", "--", source_url])
            .await?;
        match parse_metadata(&String::from_utf8_lossy(&output.stdout)) {
            Ok(metadata) => Ok(metadata),
            Err(err) => {
                warn!(error = %err, source_url, "metadata output unreadable, using empty metadata");
                Ok(VideoMetadata::default())
            }
        }
    }

    async fn download_to_path(&self, source_url: &str, destination: &Path) -> ExtractorResult<()> {
        let destination_arg = destination.to_string_lossy();
        self.run(&[
            "-f",
            FORMAT_SELECTOR,
            "--no-part",
            "-o",
            destination_arg.as_ref(),
            "--",
            source_url,
        ])
        .await?;

        match fs::metadata(destination).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(ExtractorError::FileMissing {
                path: destination.to_path_buf(),
            }),
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    debug!(error = %err, "stat of downloaded file failed");
                }
                Err(ExtractorError::FileMissing {
                    path: destination.to_path_buf(),
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Parse the first JSON document of `--dump-json` output.
///
/// Multi-entry posts print one document per line; the first entry wins.
fn parse_metadata(stdout: &str) -> Result<VideoMetadata, serde_json::Error> {
    let first = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let info: InfoJson = serde_json::from_str(first)?;

    let title = info.title.unwrap_or_default();
    let description = match info.description {
        Some(description) if !description.is_empty() => description,
        _ => title.clone(),
    };
    Ok(VideoMetadata {
        title,
        description,
        duration_seconds: info.duration.unwrap_or(0.0),
    })
}

/// Take the first non-empty line and insist on an HTTP(S) scheme.
fn parse_direct_url(stdout: &str) -> ExtractorResult<String> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ExtractorError::InvalidOutput(String::new()))?;

    if line.starts_with("http://") || line.starts_with("https://") {
        Ok(line.to_string())
    } else {
        Err(ExtractorError::InvalidOutput(line.to_string()))
    }
}
