//! Request dispatcher
//!
//! Owns the session state machine. Every decoded message passes through
//! [`Dispatcher::route`], which either answers immediately, hands back a validated
//! tool call for the handler to run, or produces nothing (notifications).

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::McpError;
use crate::mcp::negotiator::Negotiator;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::types::*;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInit,
    Ready,
    /// Terminal
    ShuttingDown,
}

/// A `tools/call` that passed name and argument validation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub id: RequestId,
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// What the server loop should do with a routed message
#[derive(Debug)]
pub enum Routed {
    Reply(JsonRpcResponse),
    Invoke(PendingCall),
    Ignore,
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    negotiator: Negotiator,
    state: SessionState,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            negotiator: Negotiator::new(),
            state: SessionState::AwaitingInit,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to the terminal state; later messages are dropped
    pub fn shutdown(&mut self) {
        if self.state != SessionState::ShuttingDown {
            tracing::info!(from = ?self.state, "Session shutting down");
            self.state = SessionState::ShuttingDown;
        }
    }

    /// Route one decoded message
    pub fn route(&mut self, request: JsonRpcRequest) -> Routed {
        if self.state == SessionState::ShuttingDown {
            tracing::debug!(method = %request.method, "Dropping message after shutdown");
            return Routed::Ignore;
        }

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return Routed::Ignore;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Routed::Reply(
                McpError::InvalidRequest {
                    message: format!(
                        "expected jsonrpc version \"{}\", got \"{}\"",
                        JSONRPC_VERSION, request.jsonrpc
                    ),
                }
                .into_response(id),
            );
        }

        match self.dispatch(id.clone(), request) {
            Ok(routed) => routed,
            Err(e) => {
                tracing::warn!(%id, error = %e, "Request rejected");
                Routed::Reply(e.into_response(id))
            }
        }
    }

    fn dispatch(&mut self, id: RequestId, request: JsonRpcRequest) -> Result<Routed, McpError> {
        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = self.negotiator.negotiate(request.params)?;
                self.state = SessionState::Ready;
                Ok(Routed::Reply(JsonRpcResponse::success(id, to_value(result)?)))
            }
            methods::PING => Ok(Routed::Reply(JsonRpcResponse::success(id, json!({})))),
            methods::LIST_TOOLS => {
                self.require_ready(&request.method)?;
                let result = ListToolsResult {
                    tools: self.registry.list(),
                };
                Ok(Routed::Reply(JsonRpcResponse::success(id, to_value(result)?)))
            }
            methods::CALL_TOOL => {
                self.require_ready(&request.method)?;
                Ok(Routed::Invoke(self.validate_call(id, request.params)?))
            }
            other => Err(McpError::MethodNotFound {
                method: other.to_string(),
            }),
        }
    }

    fn require_ready(&self, method: &str) -> Result<(), McpError> {
        match self.state {
            SessionState::Ready => Ok(()),
            _ => Err(McpError::NotInitialized {
                method: method.to_string(),
            }),
        }
    }

    fn validate_call(&self, id: RequestId, params: Option<Value>) -> Result<PendingCall, McpError> {
        let params: CallToolParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams {
                message: e.to_string(),
            })?
            .ok_or_else(|| McpError::InvalidParams {
                message: "tool call params required".to_string(),
            })?;

        let descriptor = self.registry.get(&params.name)?;
        let arguments = params.arguments.unwrap_or_default();
        descriptor.input_schema.validate(&arguments)?;

        Ok(PendingCall {
            id,
            name: params.name,
            arguments,
        })
    }

    fn handle_notification(&mut self, notification: &JsonRpcRequest) {
        match notification.method.as_str() {
            methods::INITIALIZED => self.negotiator.acknowledge(),
            methods::CANCELLED => tracing::info!("Received cancellation notification"),
            other => tracing::debug!("Unknown notification: {}", other),
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::Internal {
        message: e.to_string(),
    })
}
