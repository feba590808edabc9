//! Retrieval of capabilities documents.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument};
use wmtsproxy_common::{ProxyError, ProxyResult};

const FETCH_FAILED: &str = "Opening given capabilities url failed.";

/// Source of capabilities documents.
#[async_trait]
pub trait CapabilitiesFetcher: Send + Sync {
    /// Raw document at `url`.
    async fn fetch(&self, url: &str) -> ProxyResult<Bytes>;
}

/// Fetches documents over HTTP(S).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wmtsproxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CapabilitiesFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> ProxyResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProxyError::capabilities(FETCH_FAILED).with_cause(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::capabilities(FETCH_FAILED)
                .with_cause(format!("HTTP status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::capabilities(FETCH_FAILED).with_cause(e))?;
        debug!(bytes = body.len(), "Fetched capabilities document");
        Ok(body)
    }
}
