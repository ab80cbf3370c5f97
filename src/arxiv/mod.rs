//! arXiv source processing
//!
//! Fetches a paper's LaTeX source and flattens it into one text blob. The MCP
//! layer only sees this through [`SourceProcessor`].

pub mod archive;
pub mod client;
pub mod id;
pub mod latex;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{Result, SourceError};

use self::client::ArxivClient;

/// Turns an identifier into flattened LaTeX, or a human-readable failure
#[async_trait]
pub trait SourceProcessor: Send + Sync {
    async fn process(&self, arxiv_id: &str) -> std::result::Result<String, SourceError>;
}

/// Downloads sources from arXiv and flattens them
pub struct ArxivProcessor {
    client: ArxivClient,
    strip_comments: bool,
}

impl ArxivProcessor {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: ArxivClient::new(config)?,
            strip_comments: config.strip_comments,
        })
    }
}

#[async_trait]
impl SourceProcessor for ArxivProcessor {
    async fn process(&self, arxiv_id: &str) -> std::result::Result<String, SourceError> {
        let id = id::normalize(arxiv_id)?;
        let bytes = self.client.download_source(&id).await?;
        let strip_comments = self.strip_comments;

        tokio::task::spawn_blocking(move || render(&bytes, strip_comments))
            .await
            .map_err(|e| SourceError::Archive {
                message: format!("unpacking task failed: {}", e),
            })?
    }
}

/// Unpack a downloaded source and flatten it from its main file
pub fn render(bytes: &[u8], strip_comments: bool) -> std::result::Result<String, SourceError> {
    let tree = archive::unpack(bytes)?;
    let main = latex::find_main_file(&tree).ok_or(SourceError::NoMainFile)?;
    tracing::debug!(main, files = tree.len(), "Flattening source");

    let flattened = latex::flatten(&tree, main);
    if strip_comments {
        Ok(latex::strip_comments(&flattened))
    } else {
        Ok(flattened)
    }
}
