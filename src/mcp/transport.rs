//! Newline-delimited JSON framing over a duplex byte stream.
//!
//! The reader yields one frame per non-empty line as raw bytes, so a line that
//! is not UTF-8 is answered like any other malformed frame. The writer serializes a
//! response fully before a single `write_all`, so frames never interleave.

use std::ops::Range;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::McpError;
use crate::mcp::types::{JsonRpcRequest, JsonRpcResponse, RequestId};

/// A frame that could not be turned into a request
#[derive(Debug)]
pub struct DecodeError {
    /// Id recovered from the frame, `Null` when unknown
    pub id: RequestId,
    pub error: McpError,
}

impl DecodeError {
    pub fn into_response(self) -> JsonRpcResponse {
        self.error.into_response(self.id)
    }
}

/// Decode one frame into a request
pub fn decode(frame: &[u8]) -> Result<JsonRpcRequest, DecodeError> {
    let frame = std::str::from_utf8(frame).map_err(|e| DecodeError {
        id: RequestId::Null,
        error: McpError::TransportError {
            message: format!("frame is not valid UTF-8: {}", e),
        },
    })?;

    let value: Value = serde_json::from_str(frame).map_err(|e| DecodeError {
        id: RequestId::Null,
        error: McpError::TransportError {
            message: e.to_string(),
        },
    })?;

    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok())
        .unwrap_or(RequestId::Null);

    serde_json::from_value(value).map_err(|e| DecodeError {
        id,
        error: McpError::InvalidRequest {
            message: e.to_string(),
        },
    })
}

/// Serialize a response into one frame, trailing newline included
pub fn encode(response: &JsonRpcResponse) -> Result<String, McpError> {
    let mut json = serde_json::to_string(response).map_err(|e| McpError::Internal {
        message: e.to_string(),
    })?;
    json.push('\n');
    Ok(json)
}

/// Reads frames from the inbound half of the stream
pub struct MessageReader<R> {
    reader: R,
    line: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
        }
    }

    /// Next non-empty line, or `None` once the stream is closed
    pub async fn next_frame(&mut self) -> std::io::Result<Option<&[u8]>> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line).await? == 0 {
                return Ok(None);
            }
            let frame = content_range(&self.line);
            if !frame.is_empty() {
                return Ok(Some(&self.line[frame]));
            }
        }
    }
}

/// Range of a line without surrounding ASCII whitespace
fn content_range(line: &[u8]) -> Range<usize> {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    start..end
}

/// Writes frames to the outbound half of the stream
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn send(&mut self, response: &JsonRpcResponse) -> crate::error::Result<()> {
        let frame = encode(response)?;
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
