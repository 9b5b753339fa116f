//! Remote resource fetching.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::config::LoaderConfig;
use crate::error::{Result, VolumeError};

/// Performs one request for a resource and returns its body.
///
/// Implementations make a single attempt; an empty body counts as a failure.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Bytes>;
}

/// [`Fetcher`] backed by a reqwest HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher from the loader configuration.
    pub fn new(config: &LoaderConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| VolumeError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes> {
        debug!(url = %url, "Fetch");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed");
            VolumeError::fetch(url.as_str(), e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Unexpected response status");
            return Err(VolumeError::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(url = %url, error = %e, "Failed to read response body");
            VolumeError::fetch(url.as_str(), e.to_string())
        })?;

        if body.is_empty() {
            return Err(VolumeError::fetch(url.as_str(), "empty response body"));
        }

        debug!(url = %url, bytes = body.len(), "Reply data");
        Ok(body)
    }
}
