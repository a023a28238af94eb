//! Library import via the beets CLI.

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::Result;

/// Imports a staging directory into the music library.
///
/// `Ok(true)` means the directory's contents were migrated; anything
/// else makes the pipeline fall back to a manual move.
#[async_trait]
pub trait LibraryImporter: Send + Sync {
    async fn import(&self, dir: &Path) -> Result<bool>;
}

/// Importer that shells out to the beets CLI.
pub struct BeetsImporter {
    binary_path: String,
    args: Vec<String>,
}

impl BeetsImporter {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            binary_path: "beet".to_string(),
            args,
        }
    }

    pub fn with_binary_path(mut self, path: impl Into<String>) -> Self {
        self.binary_path = path.into();
        self
    }
}

#[async_trait]
impl LibraryImporter for BeetsImporter {
    async fn import(&self, dir: &Path) -> Result<bool> {
        info!("Running beets import from {}", dir.display());

        let status = match tokio::process::Command::new(&self.binary_path)
            .args(&self.args)
            .arg(dir)
            .status()
            .await
        {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to launch {}: {}", self.binary_path, e);
                return Ok(false);
            }
        };

        if !status.success() {
            warn!("Beets import exited with {}", status);
            return Ok(false);
        }

        // Staging contents are migrated once beets accepts them.
        if matches!(tokio::fs::try_exists(dir).await, Ok(true))
            && let Err(e) = tokio::fs::remove_dir_all(dir).await
        {
            warn!("Failed to clean up staging after import: {}", e);
            return Ok(false);
        }

        info!("Beets import completed");
        Ok(true)
    }
}
