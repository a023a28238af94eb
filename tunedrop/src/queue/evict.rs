//! Age-based eviction of stale status records.
//!
//! Bounds memory for long-running processes; it expresses no business
//! rule about job lifetime. Records belonging to jobs a worker still
//! owns are exempt, however stale their timestamp.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::status::StatusStore;

/// Configuration for status-record eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Seconds between eviction passes.
    pub interval_secs: u64,
    /// Maximum record age in seconds before eviction.
    pub max_age_secs: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            max_age_secs: 3600,
        }
    }
}

impl EvictionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_max_age_secs(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }
}

/// Start the background eviction task.
pub fn spawn_eviction_task(
    config: EvictionConfig,
    store: Arc<StatusStore>,
    cancellation_token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_secs.max(1)));
        let max_age = Duration::from_secs(config.max_age_secs);

        info!(
            "Status eviction started (max age: {}s, interval: {}s)",
            config.max_age_secs, config.interval_secs
        );

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Status eviction shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = store.evict_older_than(max_age);
                    if evicted > 0 {
                        info!("Evicted {} stale status records", evicted);
                    } else {
                        debug!("No stale status records");
                    }
                }
            }
        }
    });
}
