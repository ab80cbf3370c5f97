//! Error types for the arXiv LaTeX MCP Server
//!
//! Two tiers live here. [`McpError`] is the protocol tier: every variant maps to a
//! structured JSON-RPC error response and only aborts the offending request.
//! [`SourceError`] is the domain tier: it never reaches the wire as an error and is
//! rendered into tool content instead.

use thiserror::Error;

use crate::mcp::types::{JsonRpcError, JsonRpcResponse, RequestId};

/// Main error type for the arXiv LaTeX MCP Server
#[derive(Error, Debug)]
pub enum ArxivMcpError {
    /// Source fetching/flattening errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures of the source processor.
///
/// The `Display` output is what ends up in the tool's text content, so messages
/// are written for a human reader.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Invalid arXiv ID: {id}")]
    InvalidId { id: String },

    #[error("No source available for arXiv ID {id}")]
    NotFound { id: String },

    #[error("Download failed: {message}")]
    RequestFailed { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not unpack source archive: {message}")]
    Archive { message: String },

    #[error("No main .tex file found in the source archive")]
    NoMainFile,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Protocol-level error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;
}

/// MCP protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum McpError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("Invalid argument {name}: expected {expected}")]
    InvalidArgument { name: String, expected: String },

    #[error("Server not initialized: '{method}' received before initialize")]
    NotInitialized { method: String },

    #[error("Server already initialized")]
    AlreadyInitialized,

    /// A frame on the stream that is not JSON
    #[error("Parse error: {message}")]
    TransportError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl McpError {
    /// JSON-RPC error code for this error
    pub fn code(&self) -> i32 {
        match self {
            McpError::TransportError { .. } => codes::PARSE_ERROR,
            McpError::InvalidRequest { .. } | McpError::AlreadyInitialized => {
                codes::INVALID_REQUEST
            }
            McpError::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            McpError::InvalidParams { .. }
            | McpError::UnknownTool { .. }
            | McpError::MissingArgument { .. }
            | McpError::InvalidArgument { .. } => codes::INVALID_PARAMS,
            McpError::NotInitialized { .. } => codes::SERVER_NOT_INITIALIZED,
            McpError::Internal { .. } => codes::INTERNAL_ERROR,
        }
    }

    /// Build the `{code, message}` error object
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string())
    }

    /// Build a complete error response for the given request id
    pub fn into_response(self, id: RequestId) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.to_jsonrpc_error())
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ArxivMcpError>;
