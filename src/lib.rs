//! arXiv LaTeX MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing the flattened LaTeX source of
//! arXiv papers as a single tool, `get_paper_prompt`.

pub mod arxiv;
pub mod config;
pub mod error;
pub mod mcp;

pub use config::Config;
pub use error::{ArxivMcpError, Result};
