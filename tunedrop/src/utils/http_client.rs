//! Shared HTTP client construction.

use std::sync::OnceLock;
use std::time::Duration;

use tracing::debug;

use crate::Result;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build a `reqwest::Client` with the given request timeout.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    install_rustls_provider();
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
