//! Media fetch/transcode via the yt-dlp binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{Error, Result};

/// A fetch against a job-scoped staging directory.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL to fetch.
    pub url: String,
    /// Job-exclusive staging directory the artifacts land in.
    pub staging_dir: PathBuf,
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchSummary {
    /// Files produced under the staging directory.
    pub files: Vec<PathBuf>,
    /// Short human-readable label for status messages.
    pub label: Option<String>,
}

/// Fetches and transcodes media into a staging directory.
///
/// Producing no files is an error; the pipeline treats it as fatal.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchSummary>;
}

/// Options for the yt-dlp invocation.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// Path to the yt-dlp binary.
    pub binary_path: String,
    /// Target audio codec (e.g. "m4a").
    pub audio_codec: String,
    /// Target audio quality; "best" selects best VBR.
    pub audio_quality: String,
    /// Socket timeout passed to yt-dlp, in seconds.
    pub socket_timeout_secs: u64,
    /// Suppress yt-dlp's own output.
    pub quiet: bool,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
            audio_codec: "m4a".to_string(),
            audio_quality: "192".to_string(),
            socket_timeout_secs: 30,
            quiet: true,
        }
    }
}

/// yt-dlp-based fetcher.
pub struct YtDlpFetcher {
    config: YtDlpConfig,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self::with_config(YtDlpConfig::default())
    }

    pub fn with_config(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Build the yt-dlp argument list for a fetch.
    fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        // "best" maps to VBR quality 0 for the audio extractor.
        let quality = if self.config.audio_quality.eq_ignore_ascii_case("best") {
            "0".to_string()
        } else {
            self.config.audio_quality.clone()
        };

        let output_template = format!(
            "{}/%(album|Unknown Album)s/%(playlist_index|00)s - %(title)s - %(artist|Unknown Artist)s.%(ext)s",
            request.staging_dir.display()
        );

        let mut args = vec![
            "-f".to_string(),
            "bestaudio[ext=m4a]/bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.config.audio_codec.clone(),
            "--audio-quality".to_string(),
            quality,
            "--embed-metadata".to_string(),
            "--embed-thumbnail".to_string(),
            "--ignore-errors".to_string(),
            "--socket-timeout".to_string(),
            self.config.socket_timeout_secs.to_string(),
            "-o".to_string(),
            output_template,
        ];

        if self.config.quiet {
            args.push("--quiet".to_string());
            args.push("--no-warnings".to_string());
        }

        args.push(request.url.clone());
        args
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchSummary> {
        let args = self.build_args(request);
        debug!("{} {}", self.config.binary_path, args.join(" "));

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                Error::fetch(format!(
                    "failed to launch {}: {}",
                    self.config.binary_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no output")
                .to_string();
            return Err(Error::fetch(format!(
                "yt-dlp exited with {}: {}",
                output.status, detail
            )));
        }

        let files = collect_files(&request.staging_dir).await?;
        if files.is_empty() {
            return Err(Error::fetch("no result produced"));
        }

        let label = files
            .first()
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned());

        info!("Fetched {} file(s) for {}", files.len(), request.url);
        Ok(FetchSummary { files, label })
    }
}

/// Collect every file under `root`, sorted by path.
pub(crate) async fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                dirs.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
