//! Source URL resolution via the Odesli links API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::utils::http_client::build_http_client;
use crate::{Error, Result};

/// Resolves an arbitrary music URL to a fetchable source URL.
///
/// Resolution failure is never fatal to a job; the pipeline falls back
/// to the input URL.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<String>;
}

/// Resolver backed by the Odesli (song.link) API.
///
/// URLs that already point at a playable source are passed through
/// untouched; anything else is looked up and mapped to its YouTube
/// Music or YouTube counterpart.
pub struct OdesliResolver {
    client: reqwest::Client,
    api_url: String,
}

impl OdesliResolver {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = build_http_client(timeout)?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    fn is_playable(url: &str) -> bool {
        url.contains("youtube.com") || url.contains("youtu.be")
    }
}

#[async_trait]
impl UrlResolver for OdesliResolver {
    async fn resolve(&self, url: &str) -> Result<String> {
        if Self::is_playable(url) {
            debug!("URL is already playable: {}", url);
            return Ok(url.to_string());
        }

        info!("Resolving URL: {}", url);
        let api_url = format!("{}{}", self.api_url, urlencoding::encode(url));
        let response = self.client.get(&api_url).send().await?.error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        let links = &body["linksByPlatform"];
        for platform in ["youtubeMusic", "youtube"] {
            if let Some(resolved) = links[platform]["url"].as_str() {
                debug!("Resolved {} via {}", url, platform);
                return Ok(resolved.to_string());
            }
        }

        Err(Error::resolve(format!("no playable link found for {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn playable_urls_pass_through() {
        let resolver = OdesliResolver::new(
            "https://api.song.link/v1-alpha.1/links?url=",
            Duration::from_secs(1),
        )
        .unwrap();

        for url in [
            "https://www.youtube.com/watch?v=abc123def45",
            "https://youtu.be/abc123def45",
            "https://music.youtube.com/watch?v=abc123def45",
        ] {
            let resolved = resolver.resolve(url).await.unwrap();
            assert_eq!(resolved, url);
        }
    }
}
