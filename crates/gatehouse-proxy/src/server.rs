//! Line-delimited JSON-RPC server over a byte stream (stdio in production).
//!
//! Requests are handled concurrently; a prompt blocked on a human does not
//! hold up anything else. Responses go through a single writer task, one
//! JSON object per line.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::prompt::PermissionPrompt;
use crate::protocol::{
    CallToolParams, INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PERMISSION_TOOL, PROTOCOL_VERSION,
};

/// Stdio permission proxy server.
pub struct ProxyServer {
    prompt: PermissionPrompt,
}

impl ProxyServer {
    /// Create a server around a prompt handler.
    pub fn new(prompt: PermissionPrompt) -> Self {
        Self { prompt }
    }

    /// Handle one line. Returns the serialized reply, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => Some(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, e.to_string())),
            Ok(value) => match serde_json::from_value::<JsonRpcRequest>(value) {
                Err(e) => Some(JsonRpcResponse::failure(Value::Null, INVALID_REQUEST, e.to_string())),
                Ok(request) => self.handle_request(request).await,
            },
        }?;
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "failed to encode response");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);
        debug!(method = %request.method, "request");
        Some(match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": [permission_tool()] })),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => return JsonRpcResponse::failure(id, INVALID_PARAMS, "missing params"),
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
        };
        if params.name != PERMISSION_TOOL {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("unknown tool: {}", params.name));
        }

        let decision = self.prompt.decide(&params.arguments).await;
        let text = serde_json::to_string(&decision)
            .unwrap_or_else(|_| r#"{"behavior":"deny","message":"Permission check failed"}"#.into());
        JsonRpcResponse::success(id, json!({ "content": [{ "type": "text", "text": text }] }))
    }

    /// Serve until `reader` hits EOF, then wait for in-flight replies.
    pub async fn run<R, W>(self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::new(self);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        info!("permission proxy ready");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let server = Arc::clone(&server);
            let tx = tx.clone();
            drop(tokio::spawn(async move {
                if let Some(reply) = server.handle_line(&line).await {
                    let _ = tx.send(reply);
                }
            }));
        }
        drop(tx);
        info!("input closed, draining replies");

        match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": "gatehouse-proxy", "version": env!("CARGO_PKG_VERSION") },
    })
}

fn permission_tool() -> Value {
    json!({
        "name": PERMISSION_TOOL,
        "description": "Ask a human to approve or deny a tool call before it runs.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "tool_name": { "type": "string" },
                "input": { "type": "object" },
                "action": { "type": "string" },
                "description": { "type": "string" },
                "resource": { "type": "string" },
                "details": { "type": "object" }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BrokerClient;
    use std::time::Duration;

    fn server() -> ProxyServer {
        let client = BrokerClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        ProxyServer::new(PermissionPrompt::new(client, None))
    }

    async fn reply(line: &str) -> Value {
        serde_json::from_str(&server().handle_line(line).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn initialize_advertises_tools() {
        let resp = reply(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let out = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let resp = reply(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"rm","arguments":{}}}"#,
        )
        .await;
        assert_eq!(resp["id"], "a");
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn non_request_object_is_invalid_request() {
        let resp = reply(r#"{"jsonrpc":"2.0","id":1}"#).await;
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn broker_failure_is_a_deny_result_not_an_error() {
        let resp = reply(
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"permission_prompt","arguments":{"tool_name":"Bash","input":{"command":"ls"}}}}"#,
        )
        .await;
        assert!(resp.get("error").is_none());
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        let decision: Value = serde_json::from_str(text).unwrap();
        assert_eq!(decision["behavior"], "deny");
    }
}
