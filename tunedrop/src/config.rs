//! Process configuration loaded from the environment.
//!
//! Every setting has a default so a bare `tunedrop` invocation works out
//! of the box; `.env` files are honored via `dotenvy` in `main`.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Default Odesli links endpoint used for URL resolution.
const DEFAULT_ODESLI_API_URL: &str = "https://api.song.link/v1-alpha.1/links?url=";

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API binds to.
    pub bind_address: String,
    /// Port the HTTP API listens on.
    pub port: u16,
    /// Scratch root for in-flight downloads, one subdirectory per job.
    pub staging_dir: PathBuf,
    /// Final destination for downloaded music.
    pub library_dir: PathBuf,
    /// Number of download workers (clamped to at least 1).
    pub worker_count: usize,
    /// Target audio codec for extraction (e.g. "m4a").
    pub audio_codec: String,
    /// Target audio quality ("best" selects best VBR).
    pub audio_quality: String,
    /// Whether to import finished downloads with beets.
    pub use_beets: bool,
    /// Arguments passed to the beets binary before the staging path.
    pub beets_args: Vec<String>,
    /// Odesli links API endpoint, with the `url=` query prefix.
    pub odesli_api_url: String,
    /// Timeout for outbound HTTP calls (resolution, rescan pings).
    pub request_timeout: Duration,
    /// URLs pinged after a successful download, best-effort.
    pub rescan_urls: Vec<String>,
    /// Interval between status-record eviction passes.
    pub evict_interval: Duration,
    /// Maximum status-record age before eviction.
    pub evict_max_age: Duration,
    /// How long a worker waits on an empty queue before re-checking the
    /// shutdown flag.
    pub dequeue_poll: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 4533,
            staging_dir: PathBuf::from("staging"),
            library_dir: PathBuf::from("library"),
            worker_count: 1,
            audio_codec: "m4a".to_string(),
            audio_quality: "192".to_string(),
            use_beets: false,
            beets_args: vec!["import".to_string(), "-q".to_string()],
            odesli_api_url: DEFAULT_ODESLI_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            rescan_urls: Vec::new(),
            evict_interval: Duration::from_secs(600),
            evict_max_age: Duration::from_secs(3600),
            dequeue_poll: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Keeps parsing testable without mutating the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDRESS")
            && !addr.trim().is_empty()
        {
            config.bind_address = addr;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse(&port, "PORT")?;
        }
        if let Some(dir) = lookup("STAGING_DIR")
            && !dir.trim().is_empty()
        {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("LIBRARY_DIR")
            && !dir.trim().is_empty()
        {
            config.library_dir = PathBuf::from(dir);
        }
        if let Some(count) = lookup("WORKER_COUNT") {
            let count: usize = parse(&count, "WORKER_COUNT")?;
            config.worker_count = count.max(1);
        }
        if let Some(codec) = lookup("AUDIO_CODEC")
            && !codec.trim().is_empty()
        {
            config.audio_codec = codec;
        }
        if let Some(quality) = lookup("AUDIO_QUALITY")
            && !quality.trim().is_empty()
        {
            config.audio_quality = quality;
        }
        if let Some(flag) = lookup("USE_BEETS") {
            config.use_beets = flag.trim().eq_ignore_ascii_case("true");
        }
        if let Some(args) = lookup("BEETS_ARGS") {
            config.beets_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(url) = lookup("ODESLI_API_URL")
            && !url.trim().is_empty()
        {
            config.odesli_api_url = url;
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse(&secs, "REQUEST_TIMEOUT_SECS")?);
        }
        if let Some(urls) = lookup("RESCAN_URLS") {
            config.rescan_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secs) = lookup("EVICT_INTERVAL_SECS") {
            config.evict_interval = Duration::from_secs(parse(&secs, "EVICT_INTERVAL_SECS")?);
        }
        if let Some(secs) = lookup("EVICT_MAX_AGE_SECS") {
            config.evict_max_age = Duration::from_secs(parse(&secs, "EVICT_MAX_AGE_SECS")?);
        }
        if let Some(ms) = lookup("DEQUEUE_POLL_MS") {
            config.dequeue_poll = Duration::from_millis(parse(&ms, "DEQUEUE_POLL_MS")?);
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("invalid value for {}: {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 4533);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.staging_dir, PathBuf::from("staging"));
        assert_eq!(config.beets_args, vec!["import", "-q"]);
        assert!(!config.use_beets);
        assert!(config.rescan_urls.is_empty());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("WORKER_COUNT", "4"),
            ("AUDIO_CODEC", "mp3"),
            ("USE_BEETS", "True"),
            ("BEETS_ARGS", "import -q -A"),
            ("RESCAN_URLS", "http://a/rescan, http://b/rescan"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.audio_codec, "mp3");
        assert!(config.use_beets);
        assert_eq!(config.beets_args, vec!["import", "-q", "-A"]);
        assert_eq!(config.rescan_urls.len(), 2);
    }

    #[test]
    fn worker_count_is_clamped_to_one() {
        let config = config_from(&[("WORKER_COUNT", "0")]).unwrap();
        assert_eq!(config.worker_count, 1);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("PORT", "not-a-port")]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
