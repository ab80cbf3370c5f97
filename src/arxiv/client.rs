//! arXiv HTTP client
//!
//! Downloads the e-print source bundle for a paper.

use crate::config::Config;
use crate::error::{Result, SourceError};

/// arXiv source download client
pub struct ArxivClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// Base URL, without trailing slash
    base_url: String,
}

impl ArxivClient {
    /// Create a new arXiv client
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the source bundle for an id
    pub fn source_url(&self, arxiv_id: &str) -> String {
        format!("{}/src/{}", self.base_url, arxiv_id)
    }

    /// Download the raw source bundle
    pub async fn download_source(&self, arxiv_id: &str) -> std::result::Result<Vec<u8>, SourceError> {
        let url = self.source_url(arxiv_id);
        tracing::debug!(%url, "Downloading source");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound {
                id: arxiv_id.to_string(),
            });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(SourceError::RequestFailed {
                message: format!("arXiv returned {} for {}: {}", status, arxiv_id, snippet.trim()),
            });
        }

        let bytes = response.bytes().await?;
        tracing::debug!(arxiv_id, bytes = bytes.len(), "Downloaded source");
        Ok(bytes.to_vec())
    }
}
