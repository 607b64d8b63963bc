#![allow(missing_docs)]

//! End-to-end HTTP behavior through the router.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use gatehouse_runtime::AgentError;
use gatehouse_runtime::agent::{
    AdapterConfig, AgentCall, AgentInvocationAdapter, AgentRuntime, TurnStream,
};
use gatehouse_runtime::broker::PermissionBroker;
use gatehouse_runtime::workspace::SessionWorkspaceManager;
use gatehouse_server::GatehouseServer;
use serde_json::{Value, json};
use tower::ServiceExt;

struct EchoRuntime;

#[async_trait]
impl AgentRuntime for EchoRuntime {
    async fn invoke(&self, call: AgentCall) -> Result<TurnStream, AgentError> {
        let events = vec![
            Ok(json!({"type": "system", "subtype": "init", "session_id": "agent-1"})),
            Ok(json!(format!("you said: {}", call.prompt))),
            Ok(json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "bye"}]}})),
            Ok(json!({"type": "result", "result": "you said ... bye"})),
        ];
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

fn make_server() -> (tempfile::TempDir, GatehouseServer) {
    let tmp = tempfile::tempdir().unwrap();
    let workspaces = Arc::new(SessionWorkspaceManager::open(tmp.path()).unwrap());
    let adapter = Arc::new(AgentInvocationAdapter::new(
        Arc::new(EchoRuntime),
        workspaces,
        AdapterConfig {
            broker_url: "http://127.0.0.1:8787".into(),
            proxy_command: "gatehouse-proxy".into(),
            proxy_args: vec![],
            proxy_timeout_secs: 65,
        },
    ));
    let broker = PermissionBroker::new(Duration::from_secs(60), 16);
    (tmp, GatehouseServer::new(broker, adapter, None))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

async fn until_pending(broker: &PermissionBroker, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while broker.pending_count() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn permission_round_trip() {
    let (_tmp, server) = make_server();
    let app = server.router();
    let broker = server.state().broker.clone();

    let submit_app = app.clone();
    let submitter = tokio::spawn(async move {
        call(
            &submit_app,
            post_json(
                "/api/permissions/request",
                &json!({"action": "Write", "description": "write notes.md", "resource": "/w/notes.md"}),
            ),
        )
        .await
    });
    until_pending(&broker, 1).await;

    let (status, pending) = call(&app, get("/api/permissions")).await;
    assert_eq!(status, StatusCode::OK);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["action"], "Write");
    assert_eq!(pending[0]["status"], "pending");
    assert!(pending[0]["timestamp"].is_string());
    let id = pending[0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/permissions/{id}/respond");
    let (status, body) = call(&app, post_json(&uri, &json!({"approved": true, "reason": "fine"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, decision) = submitter.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision, json!({"approved": true, "reason": "fine"}));

    let (status, body) = call(&app, post_json(&uri, &json!({"approved": false}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn missing_description_is_rejected() {
    let (_tmp, server) = make_server();
    let app = server.router();
    let (status, body) = call(&app, post_json("/api/permissions/request", &json!({"action": "Write"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(server.state().broker.pending_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let (_tmp, server) = make_server();
    let req = Request::builder()
        .method("POST")
        .uri("/api/permissions/request")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = call(&server.router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn sessions_are_idempotent() {
    let (_tmp, server) = make_server();
    let app = server.router();

    let req = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .body(Body::empty())
        .unwrap();
    let (status, first) = call(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = first["sessionId"].as_str().unwrap();

    let (status, again) = call(&app, post_json("/api/sessions", &json!({"sessionId": session_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["workspaceDir"], first["workspaceDir"]);
}

#[tokio::test]
async fn chat_joins_text_and_returns_agent_session() {
    let (_tmp, server) = make_server();
    let app = server.router();
    let (status, body) = call(&app, post_json("/api/chat", &json!({"prompt": "hi"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "you said: hi\n\nbye");
    assert_eq!(body["sessionId"], "agent-1");

    let bound = server.state().workspaces.get("agent-1").unwrap();
    assert!(bound.agent_bound);
}

#[tokio::test]
async fn chat_without_prompt_is_400() {
    let (_tmp, server) = make_server();
    let (status, body) = call(&server.router(), post_json("/api/chat", &json!({"prompt": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("prompt"));
}

#[tokio::test]
async fn chat_stream_emits_events_then_done() {
    let (_tmp, server) = make_server();
    let resp = server
        .router()
        .oneshot(post_json("/api/chat/stream", &json!({"prompt": "hi"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/event-stream");

    let body = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let frames: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    let types: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["session-bound", "text", "text", "done"]);
    assert_eq!(frames[3]["sessionId"], "agent-1");
}

#[tokio::test]
async fn observer_stream_starts_with_connected_then_snapshot() {
    let (_tmp, server) = make_server();
    let app = server.router();
    let broker = server.state().broker.clone();
    for (i, action) in ["Read", "Write"].into_iter().enumerate() {
        let app = app.clone();
        let body = json!({"action": action, "description": format!("{action} a file")});
        drop(tokio::spawn(async move {
            call(&app, post_json("/api/permissions/request", &body)).await
        }));
        until_pending(&broker, i + 1).await;
    }

    let resp = app.clone().oneshot(get("/api/permissions/stream")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut body = resp.into_body().into_data_stream();

    let mut frames: Vec<Value> = Vec::new();
    while frames.len() < 2 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        frames.extend(
            text.lines()
                .filter_map(|line| line.strip_prefix("data: "))
                .map(|data| serde_json::from_str::<Value>(data).unwrap()),
        );
    }
    assert_eq!(frames[0]["type"], "connected");
    assert!(frames[0]["subscriberId"].as_str().unwrap().starts_with("sub_"));
    assert_eq!(frames[1]["type"], "pending-permissions");
    assert_eq!(frames[1]["requests"].as_array().unwrap().len(), 2);
    assert_eq!(server.state().fanout.connection_count(), 1);

    drop(body);
    assert_eq!(server.state().fanout.connection_count(), 0);
}
