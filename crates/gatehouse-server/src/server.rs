//! `GatehouseServer`: Axum HTTP server over the broker and adapter.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use gatehouse_runtime::agent::AgentInvocationAdapter;
use gatehouse_runtime::broker::PermissionBroker;
use gatehouse_runtime::workspace::SessionWorkspaceManager;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::fanout::TransportFanout;
use crate::health::{self, HealthResponse};
use crate::routes::{chat, permissions, sessions};
use crate::shutdown::ShutdownCoordinator;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Permission broker.
    pub broker: PermissionBroker,
    /// Session workspaces.
    pub workspaces: Arc<SessionWorkspaceManager>,
    /// Agent invocation adapter.
    pub adapter: Arc<AgentInvocationAdapter>,
    /// Observer fan-out.
    pub fanout: Arc<TransportFanout>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// The gatehouse HTTP server.
pub struct GatehouseServer {
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl GatehouseServer {
    /// Create a server. `metrics` enables `GET /metrics`.
    pub fn new(
        broker: PermissionBroker,
        adapter: Arc<AgentInvocationAdapter>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let fanout = Arc::new(TransportFanout::new(broker.clone(), shutdown.token()));
        let state = AppState {
            workspaces: Arc::clone(adapter.workspaces()),
            broker,
            adapter,
            fanout,
            metrics,
            start_time: Instant::now(),
        };
        Self { state, shutdown }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/api/permissions", get(permissions::list))
            .route("/api/permissions/request", post(permissions::create))
            .route("/api/permissions/stream", get(permissions::stream))
            .route("/api/permissions/{id}/respond", post(permissions::respond))
            .route("/api/sessions", post(sessions::get_or_create))
            .route("/api/chat", post(chat::complete))
            .route("/api/chat/stream", post(chat::stream))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Serve on `listener` until the shutdown coordinator fires.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        let token = self.shutdown.token();
        info!(%addr, "gatehouse server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;
        info!("gatehouse server stopped");
        Ok(())
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.fanout.connection_count(),
        state.broker.pending_count(),
        state.workspaces.session_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => crate::metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use gatehouse_runtime::AgentError;
    use gatehouse_runtime::agent::{AdapterConfig, AgentCall, AgentRuntime, TurnStream};
    use tower::ServiceExt;

    struct SilentRuntime;

    #[async_trait]
    impl AgentRuntime for SilentRuntime {
        async fn invoke(&self, _call: AgentCall) -> Result<TurnStream, AgentError> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    fn make_server() -> (tempfile::TempDir, GatehouseServer) {
        let tmp = tempfile::tempdir().unwrap();
        let workspaces = Arc::new(SessionWorkspaceManager::open(tmp.path()).unwrap());
        let adapter = Arc::new(AgentInvocationAdapter::new(
            Arc::new(SilentRuntime),
            workspaces,
            AdapterConfig {
                broker_url: "http://127.0.0.1:0".into(),
                proxy_command: "gatehouse-proxy".into(),
                proxy_args: vec![],
                proxy_timeout_secs: 65,
            },
        ));
        (tmp, GatehouseServer::new(PermissionBroker::default(), adapter, None))
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (_tmp, server) = make_server();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["pendingPermissions"], 0);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_404() {
        let (_tmp, server) = make_server();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (_tmp, server) = make_server();
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn shutdown_coordinator_accessible() {
        let (_tmp, server) = make_server();
        assert!(!server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let (_tmp, server) = make_server();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Arc::clone(server.shutdown());
        let handle = tokio::spawn(server.serve(listener));
        shutdown.shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
