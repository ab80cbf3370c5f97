//! Integration tests for the arXiv LaTeX MCP Server
//!
//! These tests drive a full server session over an in-memory duplex stream.
//! The source processor is stubbed - no network access is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use arxiv_latex_mcp::arxiv::SourceProcessor;
use arxiv_latex_mcp::error::{codes, SourceError};
use arxiv_latex_mcp::mcp::server::McpServer;
use arxiv_latex_mcp::mcp::tools::{self, ERROR_PREFIX, RENDERING_INSTRUCTIONS};

/// Deterministic processor with one failing id
struct StubProcessor {
    calls: AtomicUsize,
}

impl StubProcessor {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SourceProcessor for StubProcessor {
    async fn process(&self, arxiv_id: &str) -> Result<String, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match arxiv_id {
            "9999.99999" => Err(SourceError::RequestFailed {
                message: "paper withdrawn".to_string(),
            }),
            "1706.03762" => Ok("\\section{Intro}...".to_string()),
            other => Ok(format!("T[{}]", other)),
        }
    }
}

/// Holds "slow" calls until released
struct GatedProcessor {
    gate: Arc<Notify>,
}

#[async_trait]
impl SourceProcessor for GatedProcessor {
    async fn process(&self, arxiv_id: &str) -> Result<String, SourceError> {
        if arxiv_id == "slow" {
            self.gate.notified().await;
        }
        Ok(format!("source of {}", arxiv_id))
    }
}

struct Session {
    writer: WriteHalf<DuplexStream>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    server: JoinHandle<arxiv_latex_mcp::Result<()>>,
}

impl Session {
    fn start(processor: Arc<dyn SourceProcessor>) -> Self {
        let (client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let server = McpServer::new(tools::default_registry().unwrap(), processor);
        let server = tokio::spawn(async move {
            server
                .serve(BufReader::new(server_read), server_write)
                .await
        });

        let (client_read, writer) = tokio::io::split(client);
        Self {
            writer,
            lines: BufReader::new(client_read).lines(),
            server,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    async fn send_bytes(&mut self, line: &[u8]) {
        self.writer.write_all(line).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for response")
            .unwrap()
            .expect("stream closed");
        serde_json::from_str(&line).expect("response is not JSON")
    }

    async fn request(&mut self, id: i64, method: &str, params: Option<Value>) -> Value {
        self.send(make_request(id, method, params)).await;
        self.recv().await
    }

    async fn initialize(&mut self) -> Value {
        let response = self
            .request(
                0,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "clientInfo": {"name": "test-client", "version": "1.0.0"},
                    "capabilities": {}
                })),
            )
            .await;
        self.send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        response
    }

    async fn call_paper(&mut self, id: i64, arxiv_id: &str) -> Value {
        self.request(
            id,
            "tools/call",
            Some(json!({"name": "get_paper_prompt", "arguments": {"arxiv_id": arxiv_id}})),
        )
        .await
    }

    async fn close(mut self) -> arxiv_latex_mcp::Result<()> {
        self.writer.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.server)
            .await
            .expect("server did not stop")
            .unwrap()
    }
}

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> Value {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request
}

fn content_text(response: &Value) -> &str {
    let content = response["result"]["content"].as_array().expect("content array");
    assert_eq!(content.len(), 1);
    assert_eq!(content[0]["type"], "text");
    content[0]["text"].as_str().unwrap()
}

mod handshake_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_initialize_reports_capabilities() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        let response = session.initialize().await;

        assert_eq!(response["id"], 0);
        assert_eq!(response["result"]["serverInfo"]["name"], "arxiv-latex-mcp");
        assert!(response["result"]["serverInfo"]["version"].is_string());
        assert_eq!(
            response["result"]["capabilities"],
            json!({"tools": {"listChanged": false}})
        );
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_tools_rejected_before_handshake() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));

        let list = session.request(1, "tools/list", None).await;
        assert_eq!(list["id"], 1);
        assert_eq!(list["error"]["code"], codes::SERVER_NOT_INITIALIZED);

        let call = session.call_paper(2, "2403.12345").await;
        assert_eq!(call["id"], 2);
        assert_eq!(call["error"]["code"], codes::SERVER_NOT_INITIALIZED);
        assert!(call["result"].is_null());

        // the session survives and can still be initialized
        let init = session.initialize().await;
        assert!(init["result"].is_object());

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_initialize_rejected() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let again = session.request(5, "initialize", Some(json!({}))).await;
        assert_eq!(again["id"], 5);
        assert_eq!(again["error"]["code"], codes::INVALID_REQUEST);

        // still ready
        let list = session.request(6, "tools/list", None).await;
        assert!(list["result"]["tools"].is_array());

        session.close().await.unwrap();
    }
}

mod tool_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_scenario_list_then_call() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let list = session.request(1, "tools/list", None).await;
        let tools = list["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "get_paper_prompt");
        assert_eq!(tools[0]["inputSchema"]["properties"]["arxiv_id"]["type"], "string");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["arxiv_id"]));

        let call = session.call_paper(2, "1706.03762").await;
        assert_eq!(call["id"], 2);
        assert!(call["error"].is_null());
        assert_eq!(
            content_text(&call),
            format!("\\section{{Intro}}...{}", RENDERING_INSTRUCTIONS)
        );

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_success_is_text_plus_instructions() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let call = session.call_paper(3, "2403.12345").await;
        assert_eq!(
            content_text(&call),
            format!("T[2403.12345]{}", RENDERING_INSTRUCTIONS)
        );
        assert!(RENDERING_INSTRUCTIONS.contains("($...$)"));
        assert!(RENDERING_INSTRUCTIONS.contains("($$...$$)"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_processor_failure_is_successful_response() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let call = session.call_paper(4, "9999.99999").await;
        assert_eq!(call["id"], 4);
        assert!(call["error"].is_null());

        let text = content_text(&call);
        assert!(text.starts_with(ERROR_PREFIX));
        assert!(text.contains("9999.99999"));
        assert!(text.contains("paper withdrawn"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let call = session
            .request(
                5,
                "tools/call",
                Some(json!({"name": "get_weather", "arguments": {"city": "Paris"}})),
            )
            .await;
        assert_eq!(call["id"], 5);
        assert_eq!(call["error"]["code"], codes::INVALID_PARAMS);
        assert!(call["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Unknown tool"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_argument_is_protocol_error() {
        let processor = Arc::new(StubProcessor::new());
        let mut session = Session::start(processor.clone());
        session.initialize().await;

        let call = session
            .request(
                6,
                "tools/call",
                Some(json!({"name": "get_paper_prompt", "arguments": {}})),
            )
            .await;
        assert_eq!(call["id"], 6);
        assert_eq!(call["error"]["code"], codes::INVALID_PARAMS);
        assert!(call["error"]["message"]
            .as_str()
            .unwrap()
            .contains("arxiv_id"));

        session.close().await.unwrap();
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identical_calls_are_identical() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let first = session.call_paper(7, "2403.12345").await;
        let second = session.call_paper(8, "2403.12345").await;
        assert_eq!(first["result"], second["result"]);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_independent_of_history() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        let before = session.request(1, "tools/list", None).await;
        session.call_paper(2, "9999.99999").await;
        session.request(3, "tools/call", Some(json!({"name": "nope"}))).await;
        let after = session.request(4, "tools/list", None).await;

        assert_eq!(before["result"], after["result"]);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_string_ids_are_echoed() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));
        session.initialize().await;

        session
            .send(json!({
                "jsonrpc": "2.0",
                "id": "call-abc",
                "method": "tools/call",
                "params": {"name": "get_paper_prompt", "arguments": {"arxiv_id": "2403.12345"}}
            }))
            .await;
        let response = session.recv().await;
        assert_eq!(response["id"], "call-abc");

        session.close().await.unwrap();
    }
}

mod transport_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_malformed_line_does_not_end_session() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));

        session.send_raw("{this is not json").await;
        let error = session.recv().await;
        assert!(error["id"].is_null());
        assert_eq!(error["error"]["code"], codes::PARSE_ERROR);

        let init = session.initialize().await;
        assert!(init["result"].is_object());

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_session() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));

        session
            .send_bytes(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"x\":\"\xff\"}")
            .await;
        let error = session.recv().await;
        assert!(error["id"].is_null());
        assert_eq!(error["error"]["code"], codes::PARSE_ERROR);

        let init = session.initialize().await;
        assert_eq!(init["id"], 0);
        assert!(init["result"].is_object());

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_method_and_ping() {
        let mut session = Session::start(Arc::new(StubProcessor::new()));

        let ping = session.request(1, "ping", None).await;
        assert_eq!(ping["result"], json!({}));

        let unknown = session.request(2, "resources/list", None).await;
        assert_eq!(unknown["error"]["code"], codes::METHOD_NOT_FOUND);

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_shuts_down_cleanly() {
        let session = Session::start(Arc::new(StubProcessor::new()));
        session.close().await.unwrap();
    }
}

mod concurrency_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_slow_call_does_not_block_discovery() {
        let gate = Arc::new(Notify::new());
        let mut session = Session::start(Arc::new(GatedProcessor { gate: gate.clone() }));
        session.initialize().await;

        session
            .send(make_request(
                1,
                "tools/call",
                Some(json!({"name": "get_paper_prompt", "arguments": {"arxiv_id": "slow"}})),
            ))
            .await;

        let list = session.request(2, "tools/list", None).await;
        assert_eq!(list["id"], 2);

        let fast = session.call_paper(3, "fast").await;
        assert_eq!(fast["id"], 3);

        gate.notify_one();
        let slow = session.recv().await;
        assert_eq!(slow["id"], 1);
        assert!(content_text(&slow).starts_with("source of slow"));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_flight_call_completes_after_eof() {
        let gate = Arc::new(Notify::new());
        let mut session = Session::start(Arc::new(GatedProcessor { gate: gate.clone() }));
        session.initialize().await;

        session
            .send(make_request(
                9,
                "tools/call",
                Some(json!({"name": "get_paper_prompt", "arguments": {"arxiv_id": "slow"}})),
            ))
            .await;
        session.writer.shutdown().await.unwrap();

        gate.notify_one();
        let response = session.recv().await;
        assert_eq!(response["id"], 9);

        let Session { server, .. } = session;
        server.await.unwrap().unwrap();
    }
}
