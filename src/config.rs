//! Configuration management for the arXiv LaTeX MCP Server
//!
//! Handles environment variables and server identity constants.

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Server identity reported during the handshake
pub const SERVER_NAME: &str = "arxiv-latex-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the arXiv LaTeX MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the arXiv mirror serving `/src/<id>`
    pub base_url: String,

    /// Timeout for a single source download
    pub request_timeout: Duration,

    /// Whether to strip LaTeX comments from the flattened source
    pub strip_comments: bool,

    /// User agent sent with downloads
    pub user_agent: String,
}

impl Config {
    /// Create a new configuration from the environment.
    ///
    /// Values are parsed but not validated, so that command line overrides can
    /// still replace them. Call [`Config::validate`] once overrides are applied.
    pub fn new() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("ARXIV_BASE_URL").unwrap_or_else(|| arxiv::BASE_URL.to_string());

        let timeout_secs = match lookup("ARXIV_TIMEOUT_SECS") {
            Some(raw) => parse_timeout("ARXIV_TIMEOUT_SECS", &raw)?,
            None => arxiv::DEFAULT_TIMEOUT_SECS,
        };

        let strip_comments = match lookup("ARXIV_STRIP_COMMENTS") {
            Some(raw) => parse_flag("ARXIV_STRIP_COMMENTS", &raw)?,
            None => false,
        };

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            strip_comments,
            user_agent: format!("{}/{}", SERVER_NAME, SERVER_VERSION),
        })
    }

    /// Override the download base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the download timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }

    /// Override comment stripping
    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidConfig {
                message: format!("base URL must be http(s): {}", self.base_url),
            }
            .into());
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig {
                message: "request timeout must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: arxiv::BASE_URL.to_string(),
            request_timeout: Duration::from_secs(arxiv::DEFAULT_TIMEOUT_SECS),
            strip_comments: false,
            user_agent: format!("{}/{}", SERVER_NAME, SERVER_VERSION),
        }
    }
}

fn parse_timeout(var: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|e| {
        ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn parse_flag(var: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }
        .into()),
    }
}

/// arXiv constants
pub mod arxiv {
    /// Public arXiv endpoint
    pub const BASE_URL: &str = "https://arxiv.org";

    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Maximum nesting of `\input`/`\include`
    pub const MAX_INCLUDE_DEPTH: usize = 16;

    /// Includes are no longer expanded once the flattened source reaches this size
    pub const MAX_FLATTENED_BYTES: usize = 32 * 1024 * 1024;
}
