//! MCP Tool definitions and handlers
//!
//! Declares the `get_paper_prompt` tool and turns source processor outcomes into
//! tool content. Processor failures stay inside this module: they are rendered as
//! text and returned as successful results.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::arxiv::SourceProcessor;
use crate::error::{McpError, Result};
use crate::mcp::dispatcher::PendingCall;
use crate::mcp::registry::{InputSchema, PropertyType, ToolDescriptor, ToolRegistry};
use crate::mcp::types::{CallToolResult, JsonRpcResponse};

pub const GET_PAPER_PROMPT: &str = "get_paper_prompt";

/// Appended to every successfully flattened paper
pub const RENDERING_INSTRUCTIONS: &str = "

IMPORTANT INSTRUCTIONS FOR RENDERING:
When discussing this paper, please use dollar sign notation ($...$) for inline equations and double dollar signs ($$...$$) for display equations when providing responses that include LaTeX mathematical expressions.
";

/// Prefix of the in-band failure text
pub const ERROR_PREFIX: &str = "Error processing paper";

/// Descriptors for every tool this server exposes
pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![ToolDescriptor::new(
        GET_PAPER_PROMPT,
        "Get a flattened LaTeX code of a paper from arXiv ID for precise interpretation of mathematical expressions",
        InputSchema::new().required(
            "arxiv_id",
            PropertyType::String,
            "The arXiv ID of the paper (e.g., '2403.12345')",
        ),
    )]
}

/// Registry holding [`descriptors`]
pub fn default_registry() -> Result<ToolRegistry> {
    descriptors()
        .into_iter()
        .fold(ToolRegistry::builder(), |builder, tool| builder.register(tool))
        .build()
}

/// What a tool produced. Both arms become successful responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
}

impl ToolOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ToolOutcome::Failure(_))
    }
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Success(text) | ToolOutcome::Failure(text) => CallToolResult::text(text),
        }
    }
}

/// Tool handler
pub struct ToolHandler {
    processor: Arc<dyn SourceProcessor>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(processor: Arc<dyn SourceProcessor>) -> Self {
        Self { processor }
    }

    /// Run a call the dispatcher has already validated and answer it
    pub async fn execute(&self, call: PendingCall) -> JsonRpcResponse {
        let outcome = self.call_tool(&call.name, &call.arguments).await;
        tracing::debug!(id = %call.id, tool = %call.name, failed = outcome.is_failure(), "Tool call finished");
        let result = CallToolResult::from(outcome);

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(call.id, value),
            Err(e) => McpError::Internal {
                message: e.to_string(),
            }
            .into_response(call.id),
        }
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome {
        match name {
            GET_PAPER_PROMPT => self.handle_get_paper_prompt(arguments).await,
            _ => ToolOutcome::Failure(format!("Unknown tool: {}", name)),
        }
    }

    async fn handle_get_paper_prompt(&self, arguments: &Map<String, Value>) -> ToolOutcome {
        let Some(arxiv_id) = arguments.get("arxiv_id").and_then(Value::as_str) else {
            return ToolOutcome::Failure(format!("{}: missing arxiv_id", ERROR_PREFIX));
        };

        tracing::info!(arxiv_id, "Processing arXiv paper");

        match self.processor.process(arxiv_id).await {
            Ok(prompt) => {
                tracing::info!(arxiv_id, bytes = prompt.len(), "Processed arXiv paper");
                ToolOutcome::Success(format!("{}{}", prompt, RENDERING_INSTRUCTIONS))
            }
            Err(e) => {
                let message = format!("{} {}: {}", ERROR_PREFIX, arxiv_id, e);
                tracing::error!("{}", message);
                ToolOutcome::Failure(message)
            }
        }
    }
}
