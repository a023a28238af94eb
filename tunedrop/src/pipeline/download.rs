//! The download task body: a strict state machine from intake to a
//! terminal stage.
//!
//! Stage order, with one branch on the optional library import:
//!
//! ```text
//! resolving_url -> downloading -> postprocessing
//!     -> { beets_import | moving_files } -> done
//! any stage -> failed (terminal)
//! ```
//!
//! Resolution failure falls back to the input URL; import failure falls
//! back to the manual move. A fetch that produces nothing and any
//! filesystem error while moving are fatal. The staging directory is
//! deleted on success and kept on failure for manual recovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::fetcher::{FetchRequest, MediaFetcher, collect_files};
use super::importer::LibraryImporter;
use super::rescan::RescanNotifier;
use super::resolver::UrlResolver;
use crate::Result;
use crate::queue::{Stage, StageReporter, TaskRunner};

/// Parameters of one download job.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// URL to fetch, as submitted by the caller.
    pub url: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The download pipeline.
///
/// Holds the collaborators and the two filesystem roots; one instance
/// is shared by every worker in the pool.
pub struct DownloadPipeline {
    resolver: Arc<dyn UrlResolver>,
    fetcher: Arc<dyn MediaFetcher>,
    importer: Option<Arc<dyn LibraryImporter>>,
    notifiers: Vec<Arc<dyn RescanNotifier>>,
    staging_root: PathBuf,
    library_dir: PathBuf,
}

impl DownloadPipeline {
    pub fn new(
        resolver: Arc<dyn UrlResolver>,
        fetcher: Arc<dyn MediaFetcher>,
        staging_root: impl Into<PathBuf>,
        library_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            importer: None,
            notifiers: Vec::new(),
            staging_root: staging_root.into(),
            library_dir: library_dir.into(),
        }
    }

    /// Enable the optional library-import integration.
    pub fn with_importer(mut self, importer: Arc<dyn LibraryImporter>) -> Self {
        self.importer = Some(importer);
        self
    }

    /// Add a rescan target pinged after every successful download.
    pub fn with_notifier(mut self, notifier: Arc<dyn RescanNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Job-exclusive scratch directory, keyed by the job id or by a
    /// timestamp when the invocation has no queue-level identity.
    fn staging_dir_for(&self, job_id: Option<&str>) -> PathBuf {
        match job_id {
            Some(id) => self.staging_root.join(id),
            None => self
                .staging_root
                .join(Utc::now().timestamp_millis().to_string()),
        }
    }

    async fn notify_rescan_targets(&self) {
        for notifier in &self.notifiers {
            match notifier.notify().await {
                Ok(()) => debug!("Rescan requested from {}", notifier.name()),
                Err(e) => warn!("Rescan request to {} failed: {}", notifier.name(), e),
            }
        }
    }
}

#[async_trait]
impl TaskRunner for DownloadPipeline {
    async fn download(&self, request: &DownloadRequest, reporter: &StageReporter) -> Result<()> {
        let staging_dir = self.staging_dir_for(reporter.job_id());

        reporter.stage(Stage::ResolvingUrl, format!("Resolving {}", request.url));
        let source_url = match self.resolver.resolve(&request.url).await {
            Ok(url) => url,
            Err(e) => {
                // Not fatal: fetch the submitted URL as-is.
                warn!("URL resolution failed for {}: {}", request.url, e);
                request.url.clone()
            }
        };

        reporter.stage(Stage::Downloading, format!("Downloading {}", source_url));
        tokio::fs::create_dir_all(&staging_dir).await?;
        let summary = self
            .fetcher
            .fetch(&FetchRequest {
                url: source_url,
                staging_dir: staging_dir.clone(),
            })
            .await?;

        let label = summary
            .label
            .clone()
            .unwrap_or_else(|| request.url.clone());
        reporter.stage(Stage::Postprocessing, format!("Processing {}", label));

        let mut imported = false;
        if let Some(importer) = &self.importer {
            reporter.stage(Stage::BeetsImport, format!("Importing {}", label));
            match importer.import(&staging_dir).await {
                Ok(true) => imported = true,
                Ok(false) => {
                    warn!("Library import declined; moving files manually");
                }
                Err(e) => {
                    warn!("Library import failed: {}; moving files manually", e);
                }
            }
        }

        if !imported {
            reporter.stage(
                Stage::MovingFiles,
                format!("Moving {} file(s) into the library", summary.files.len()),
            );
            move_tree(&staging_dir, &self.library_dir).await?;
        }

        // Both success paths end with the staging directory removed;
        // only failure leaves it behind.
        remove_staging_dir(&staging_dir).await;

        self.notify_rescan_targets().await;

        reporter.stage(Stage::Done, format!("Finished {}", label));
        info!("Download finished: {}", label);
        Ok(())
    }
}

/// Best-effort removal of a job's staging directory once its contents
/// are migrated. The importer may have removed it already.
async fn remove_staging_dir(staging_dir: &Path) {
    match tokio::fs::remove_dir_all(staging_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove staging directory {}: {}",
            staging_dir.display(),
            e
        ),
    }
}

/// Move every file under `from` into `to`, preserving relative
/// subpaths and creating destination directories as needed.
///
/// Errors leave the remaining staging contents in place; there is no
/// partial-move rollback.
async fn move_tree(from: &Path, to: &Path) -> Result<()> {
    for file in collect_files(from).await? {
        let Ok(relative) = file.strip_prefix(from) else {
            continue;
        };
        let dest = to.join(relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        move_file(&file, &dest).await?;
        debug!("Moved {} -> {}", file.display(), dest.display());
    }
    Ok(())
}

/// Move one file, falling back to copy-and-delete when rename fails
/// (e.g. across filesystems).
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}
