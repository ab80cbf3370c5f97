//! MCP capability negotiation during initialization.

use serde_json::Value;

use crate::config::{SERVER_NAME, SERVER_VERSION};
use crate::error::McpError;
use crate::mcp::types::{
    ClientInfo, InitializeParams, InitializeResult, ServerCapabilities, ServerInfo,
    ToolsCapability, MCP_VERSION, SUPPORTED_VERSIONS,
};

/// Tracks the one-time handshake for the lifetime of the process.
#[derive(Debug, Default)]
pub struct Negotiator {
    completed: bool,
    client_info: Option<ClientInfo>,
    protocol_version: Option<String>,
    client_acknowledged: bool,
}

impl Negotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer an `initialize` request. Succeeds at most once.
    pub fn negotiate(&mut self, params: Option<Value>) -> Result<InitializeResult, McpError> {
        if self.completed {
            return Err(McpError::AlreadyInitialized);
        }

        let params: InitializeParams = match params {
            Some(value) => serde_json::from_value(value).map_err(|e| McpError::InvalidParams {
                message: format!("invalid initialize params: {}", e),
            })?,
            None => InitializeParams::default(),
        };

        let protocol_version = select_version(params.protocol_version.as_deref());

        match &params.client_info {
            Some(client) => tracing::info!(
                client = %client.name,
                client_version = %client.version,
                protocol = %protocol_version,
                "Initialized"
            ),
            None => tracing::info!(protocol = %protocol_version, "Initialized by anonymous client"),
        }

        self.completed = true;
        self.client_info = params.client_info;
        self.protocol_version = Some(protocol_version.clone());

        Ok(InitializeResult {
            protocol_version,
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
        })
    }

    /// Record the client's `notifications/initialized`
    pub fn acknowledge(&mut self) {
        if !self.completed {
            tracing::warn!("Received initialized notification before initialize");
            return;
        }
        if self.client_acknowledged {
            tracing::debug!("Duplicate initialized notification");
            return;
        }
        self.client_acknowledged = true;
        tracing::info!(
            client = self.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("anonymous"),
            protocol = self.protocol_version.as_deref().unwrap_or(MCP_VERSION),
            "MCP handshake complete"
        );
    }

    #[cfg(test)]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    #[cfg(test)]
    pub fn client_acknowledged(&self) -> bool {
        self.client_acknowledged
    }

    #[cfg(test)]
    pub fn client_info(&self) -> Option<&ClientInfo> {
        self.client_info.as_ref()
    }

    #[cfg(test)]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }
}

/// Echo the client's version when we speak it, otherwise offer our latest
fn select_version(requested: Option<&str>) -> String {
    match requested {
        Some(version) if SUPPORTED_VERSIONS.contains(&version) => version.to_string(),
        Some(version) => {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                version,
                MCP_VERSION
            );
            MCP_VERSION.to_string()
        }
        None => MCP_VERSION.to_string(),
    }
}
