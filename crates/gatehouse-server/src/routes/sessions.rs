//! Session workspace handler.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use gatehouse_runtime::workspace::SessionWorkspace;
use serde::Deserialize;

use crate::errors::ApiError;
use crate::server::AppState;

/// Body of `POST /api/sessions`. May be omitted entirely.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    /// Session to look up or create.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST /api/sessions`
pub async fn get_or_create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionWorkspace>, ApiError> {
    let body: CreateSessionBody = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?
    };
    let workspace = Arc::clone(&state.workspaces)
        .get_or_create_async(body.session_id)
        .await?;
    Ok(Json(workspace.as_ref().clone()))
}
