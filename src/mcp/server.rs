//! MCP Server implementation
//!
//! Drives one session over a duplex stream: a read loop feeding the dispatcher,
//! tool calls running on their own tasks, and a single writer task that owns the
//! outbound half.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::arxiv::SourceProcessor;
use crate::error::{ArxivMcpError, McpError, Result};
use crate::mcp::dispatcher::{Dispatcher, Routed};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tools::ToolHandler;
use crate::mcp::transport::{self, MessageReader, MessageWriter};
use crate::mcp::types::JsonRpcResponse;

/// MCP Server for arXiv LaTeX sources
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    handler: Arc<ToolHandler>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(registry: ToolRegistry, processor: Arc<dyn SourceProcessor>) -> Self {
        Self {
            registry: Arc::new(registry),
            handler: Arc::new(ToolHandler::new(processor)),
        }
    }

    /// Run the server on stdio
    pub async fn run_stdio(&self) -> Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve a single peer until the inbound stream closes
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(response) = rx.recv().await {
                writer.send(&response).await?;
            }
            Ok::<(), ArxivMcpError>(())
        });

        let mut dispatcher = Dispatcher::new(Arc::clone(&self.registry));
        let mut reader = MessageReader::new(reader);
        let mut in_flight = JoinSet::new();

        tracing::info!("MCP server started");

        loop {
            let frame = match reader.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("EOF on input, shutting down");
                    break;
                }
                Err(e) => {
                    tracing::error!("Error reading input: {}", e);
                    break;
                }
            };

            let outgoing = match transport::decode(frame) {
                Ok(request) => match dispatcher.route(request) {
                    Routed::Reply(response) => Some(response),
                    Routed::Invoke(call) => {
                        let handler = Arc::clone(&self.handler);
                        let tx = tx.clone();
                        in_flight.spawn(async move {
                            let response = handler.execute(call).await;
                            if tx.send(response).is_err() {
                                tracing::warn!("Writer closed before tool response was sent");
                            }
                        });
                        None
                    }
                    Routed::Ignore => None,
                },
                Err(e) => {
                    tracing::warn!("Malformed message: {}", e.error);
                    Some(e.into_response())
                }
            };

            if let Some(response) = outgoing {
                if tx.send(response).is_err() {
                    tracing::error!("Writer closed, shutting down");
                    break;
                }
            }

            reap(&mut in_flight);
        }

        dispatcher.shutdown();

        if !in_flight.is_empty() {
            tracing::info!(pending = in_flight.len(), "Waiting for in-flight tool calls");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Tool task failed: {}", e);
            }
        }

        drop(tx);
        writer_task.await.map_err(|e| McpError::Internal {
            message: format!("writer task failed: {}", e),
        })??;

        Ok(())
    }
}

/// Collect finished tool tasks so panics are logged as they happen
fn reap(in_flight: &mut JoinSet<()>) {
    while let Some(joined) = in_flight.try_join_next() {
        if let Err(e) = joined {
            tracing::error!("Tool task failed: {}", e);
        }
    }
}
