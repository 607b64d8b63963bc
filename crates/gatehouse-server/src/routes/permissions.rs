//! Permission request handlers.

use std::convert::Infallible;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use futures::Stream;
use gatehouse_core::{PermissionDecision, PermissionRequest, PermissionSubmission};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::errors::ApiError;
use crate::server::AppState;

/// Body of `POST /api/permissions/{id}/respond`.
#[derive(Debug, Deserialize)]
pub struct RespondBody {
    /// Human decision.
    pub approved: bool,
    /// Optional explanation.
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /api/permissions/request`: blocks until decided or timed out.
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<PermissionSubmission>, JsonRejection>,
) -> Result<Json<PermissionDecision>, ApiError> {
    let Json(submission) = body?;
    let decision = state.broker.submit(submission).await?;
    Ok(Json(decision))
}

/// `GET /api/permissions`
pub async fn list(State(state): State<AppState>) -> Json<Vec<PermissionRequest>> {
    Json(state.broker.list_pending())
}

/// `POST /api/permissions/{id}/respond`
pub async fn respond(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RespondBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let _ = state.broker.resolve(&id, body.approved, body.reason)?;
    Ok(Json(json!({ "success": true })))
}

/// `GET /api/permissions/stream`: observer frames as Server-Sent Events.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    super::sse(state.fanout.open())
}
