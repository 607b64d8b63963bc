//! Chat handlers over the agent invocation adapter.

use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, Sse};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::server::AppState;

/// Body of both chat routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    /// User prompt.
    #[serde(default)]
    pub prompt: String,
    /// Session to continue.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response of `POST /api/chat`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Joined assistant text.
    pub text: String,
    /// Session to pass on the next turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// `POST /api/chat`: drain the invocation and return its text.
pub async fn complete(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(body) = body?;
    let outcome = state
        .adapter
        .complete(&body.prompt, body.session_id.as_deref())
        .await?;
    Ok(Json(ChatResponse {
        text: outcome.text,
        session_id: outcome.session_id,
    }))
}

/// `POST /api/chat/stream`: chat events as Server-Sent Events.
pub async fn stream(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(body) = body?;
    let events = state
        .adapter
        .invoke(&body.prompt, body.session_id.as_deref())
        .await?;
    Ok(super::sse(events))
}
