//! Best-effort library rescan notifications.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::utils::http_client::build_http_client;

/// Notifies an external catalog that the library changed.
///
/// Invoked after a job reaches terminal success; failures are logged
/// and swallowed, never fatal to a job.
#[async_trait]
pub trait RescanNotifier: Send + Sync {
    /// Name of the target, for logs.
    fn name(&self) -> &str;

    /// Ask the target to rescan its library.
    async fn notify(&self) -> Result<()>;
}

/// Notifier that pings a configured HTTP endpoint.
pub struct HttpRescanNotifier {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpRescanNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let name = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.clone());
        let client = build_http_client(timeout)?;
        Ok(Self { name, url, client })
    }
}

#[async_trait]
impl RescanNotifier for HttpRescanNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self) -> Result<()> {
        debug!("Requesting rescan from {}", self.name);
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_is_named_after_the_host() {
        let notifier =
            HttpRescanNotifier::new("http://navidrome:4533/rescan", Duration::from_secs(1))
                .unwrap();
        assert_eq!(notifier.name(), "navidrome");
    }

    #[test]
    fn unparseable_url_falls_back_to_the_raw_string() {
        let notifier = HttpRescanNotifier::new("not a url", Duration::from_secs(1)).unwrap();
        assert_eq!(notifier.name(), "not a url");
    }
}
