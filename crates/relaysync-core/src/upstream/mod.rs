//! Upstream IP-range source.
//!
//! [`UpstreamClient`] performs one bounded HTTPS GET per cycle; [`document`]
//! turns the body into an [`IpRangeSet`](relaysync_types::IpRangeSet).

mod document;

pub use document::{parse_document, RangeFilter};

use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

/// Upper bound on the upstream body. The Atlassian document is ~100 KB.
const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// HTTP client for the upstream IP-range document.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    url: String,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .user_agent(format!("relaysync/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw document body.
    ///
    /// Transport failures, timeouts, non-2xx statuses and oversized bodies all
    /// classify as `FetchError`.
    pub async fn fetch(&self) -> CoreResult<String> {
        let response = self.client.get(&self.url).header(ACCEPT, "application/json").send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::UpstreamStatus { status: status.as_u16() });
        }

        if response.content_length().is_some_and(|len| len > MAX_DOCUMENT_BYTES as u64) {
            return Err(CoreError::TooLarge { limit: MAX_DOCUMENT_BYTES });
        }

        let body = response.bytes().await?;
        if body.len() > MAX_DOCUMENT_BYTES {
            return Err(CoreError::TooLarge { limit: MAX_DOCUMENT_BYTES });
        }

        tracing::debug!("[Sync] Fetched {} bytes from {}", body.len(), self.url);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
