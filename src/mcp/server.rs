//! MCP stdio server implementation

use super::prompts::{get_prompt, get_prompt_definitions};
use super::tools::{get_tool_definitions, handle_tool_call};
use super::types::{
    McpError, McpMessage, McpNotification, McpRequest, McpResponse, JSONRPC_VERSION,
};
use crate::config::Config;
use crate::kb::KnowledgeBase;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name announced in `initialize`
pub const SERVER_NAME: &str = "icaet";

/// MCP Server implementation
pub struct McpServer {
    config: Config,
    kb: Arc<dyn KnowledgeBase>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(config: Config, kb: Arc<dyn KnowledgeBase>) -> Self {
        Self { config, kb }
    }

    /// Run the MCP server loop over stdio
    pub async fn run(self) -> Result<(), McpError> {
        info!("MCP server starting on stdio ({})", self.kb.describe());
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        Arc::new(self).serve(stdin, stdout).await?;
        info!("MCP server shutting down");
        Ok(())
    }

    /// Serve line-delimited JSON-RPC until `reader` reaches EOF.
    ///
    /// Each request runs on its own task so slow queries do not hold up
    /// other calls; responses go out through one writer as they complete.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let (tx, mut rx) = mpsc::unbounded_channel::<McpResponse>();
        let mut in_flight = JoinSet::new();
        let mut input_open = true;

        loop {
            if !input_open && in_flight.is_empty() {
                while let Ok(response) = rx.try_recv() {
                    write_response(&mut writer, &response).await?;
                }
                break;
            }

            tokio::select! {
                line = lines.next_line(), if input_open => {
                    let line = match line {
                        Ok(Some(l)) => l,
                        Ok(None) => {
                            input_open = false;
                            continue;
                        }
                        Err(e) => {
                            error!("Failed to read line: {}", e);
                            input_open = false;
                            continue;
                        }
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    debug!("Received: {}", line);

                    let message = match McpMessage::parse(&line) {
                        Ok(m) => m,
                        Err(e) => {
                            error!("Rejected message: {}", e);
                            write_response(&mut writer, &McpResponse::error(None, e)).await?;
                            continue;
                        }
                    };

                    match message {
                        McpMessage::Request(req) => {
                            let server = Arc::clone(&self);
                            let tx = tx.clone();
                            in_flight.spawn(async move {
                                let response = server.handle_request(req).await;
                                let _ = tx.send(response);
                            });
                        }
                        McpMessage::Notification(notif) => {
                            self.handle_notification(notif);
                        }
                        McpMessage::Response(_) => {
                            warn!("Unexpected response message received");
                        }
                    }
                }
                Some(response) = rx.recv() => {
                    write_response(&mut writer, &response).await?;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Request task failed: {}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle an MCP request
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        let id = request.id.clone();

        if request.jsonrpc != JSONRPC_VERSION {
            return McpResponse::error(
                id,
                McpError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => McpResponse::success(id, json!({ "tools": get_tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "prompts/list" => {
                McpResponse::success(id, json!({ "prompts": get_prompt_definitions() }))
            }
            "prompts/get" => self.handle_prompts_get(id, request.params),
            "resources/list" => McpResponse::success(id, json!({ "resources": [] })),
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        }
    }

    /// Handle notifications (fire-and-forget)
    fn handle_notification(&self, notification: McpNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                info!("Request cancelled");
            }
            _ => {
                debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    },
                    "prompts": {
                        "listChanged": false
                    }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => return McpResponse::error(id, McpError::invalid_params("Missing tool name")),
        };

        let arguments: HashMap<String, Value> = params
            .get("arguments")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        debug!("Calling tool: {}", name);

        let result = handle_tool_call(&name, &arguments, self.kb.as_ref(), &self.config).await;
        let is_error = result.is_error();

        McpResponse::success(
            id,
            json!({
                "content": result.content,
                "isError": is_error
            }),
        )
    }

    /// Handle prompts/get request
    fn handle_prompts_get(&self, id: Option<Value>, params: Option<Value>) -> McpResponse {
        let name = match params
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
        {
            Some(n) => n,
            None => return McpResponse::error(id, McpError::invalid_params("Missing prompt name")),
        };

        match get_prompt(name) {
            Some((description, content)) => McpResponse::success(
                id,
                json!({
                    "description": description,
                    "messages": [{
                        "role": "user",
                        "content": { "type": "text", "text": content }
                    }]
                }),
            ),
            None => McpResponse::error(
                id,
                McpError::invalid_params(format!("Unknown prompt: {}", name)),
            ),
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &McpResponse) -> Result<(), McpError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(response)?;
    debug!("Sending: {}", line);
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::kb::QueryResponse;
    use async_trait::async_trait;

    struct EchoKb;

    #[async_trait]
    impl KnowledgeBase for EchoKb {
        async fn ask(&self, question: &str) -> Result<QueryResponse> {
            if question.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "Question cannot be empty. Please provide a valid question.".to_string(),
                ));
            }
            let mut body = serde_json::Map::new();
            body.insert("answer".to_string(), json!(format!("echo: {}", question.trim())));
            Ok(QueryResponse::new(body))
        }

        fn describe(&self) -> String {
            "echo".to_string()
        }
    }

    fn server() -> Arc<McpServer> {
        Arc::new(McpServer::new(Config::default(), Arc::new(EchoKb)))
    }

    async fn exchange(input: &str) -> Vec<Value> {
        let mut output: Vec<u8> = Vec::new();
        server()
            .serve(BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses
            .iter()
            .find(|r| r["id"] == json!(id))
            .unwrap_or_else(|| panic!("no response for id {}", id))
    }

    fn request(id: i64, method: &str, params: Value) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = server().handle_request(request(1, "initialize", json!({}))).await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "icaet");
        assert!(result["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_runs_query() {
        let resp = server()
            .handle_request(request(
                2,
                "tools/call",
                json!({"name": "query", "arguments": {"question": "  Who spoke?  "}}),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["text"], "echo: Who spoke?");
    }

    #[tokio::test]
    async fn test_tools_call_blank_question_is_tool_error() {
        let resp = server()
            .handle_request(request(
                3,
                "tools/call",
                json!({"name": "query", "arguments": {"question": "   "}}),
            ))
            .await;
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("cannot be empty"));
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let mut req = request(4, "tools/call", json!({}));
        req.params = None;
        let resp = server().handle_request(req).await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = server()
            .handle_request(request(5, "tools/call", json!({"arguments": {}})))
            .await;
        assert_eq!(resp.error.unwrap().message, "Missing tool name");
    }

    #[tokio::test]
    async fn test_prompts_get() {
        let resp = server()
            .handle_request(request(6, "prompts/get", json!({"name": "example_questions"})))
            .await;
        let result = resp.result.unwrap();
        assert!(result["messages"][0]["content"]["text"]
            .as_str()
            .unwrap()
            .contains("Example Questions"));

        let resp = server()
            .handle_request(request(7, "prompts/get", json!({"name": "missing"})))
            .await;
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let resp = server().handle_request(request(8, "sampling/create", json!({}))).await;
        assert_eq!(resp.error.unwrap().code, -32601);

        let mut req = request(9, "ping", json!({}));
        req.jsonrpc = "1.0".to_string();
        let resp = server().handle_request(req).await;
        assert_eq!(resp.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_serve_session() {
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"query","arguments":{"question":"Hi"}}}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"prompts/list"}"#,
        ]
        .join("\n");

        let responses = exchange(&input).await;

        // One response per request; the notification and blank line produce none
        assert_eq!(responses.len(), 4);
        assert_eq!(by_id(&responses, 1)["result"]["serverInfo"]["name"], "icaet");
        assert_eq!(by_id(&responses, 2)["result"]["tools"][0]["name"], "query");
        assert_eq!(
            by_id(&responses, 3)["result"]["content"][0]["text"],
            "echo: Hi"
        );
        assert_eq!(
            by_id(&responses, 4)["result"]["prompts"]
                .as_array()
                .map(Vec::len),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_serve_parse_error() {
        let responses = exchange("{not json}\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_serve_non_object_frame_is_invalid_request() {
        let input = "[1, 2]\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
        let responses = exchange(input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32600);
        assert_eq!(by_id(&responses, 9)["result"], json!({}));
    }
}
