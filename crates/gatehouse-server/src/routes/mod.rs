//! HTTP handlers, one module per resource.
//!
//! | Module | Routes |
//! |--------|--------|
//! | `permissions` | `POST /api/permissions/request`, `GET /api/permissions`, `POST /api/permissions/{id}/respond`, `GET /api/permissions/stream` |
//! | `sessions` | `POST /api/sessions` |
//! | `chat` | `POST /api/chat`, `POST /api/chat/stream` |

pub mod chat;
pub mod permissions;
pub mod sessions;

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::warn;

/// Interval between SSE keep-alive comments.
pub const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Wrap a stream of serializable frames as an SSE response.
pub(crate) fn sse<S, T>(frames: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let events = frames.map(|frame| {
        Ok(Event::default().json_data(&frame).unwrap_or_else(|e| {
            warn!(error = %e, "failed to encode SSE frame");
            Event::default().comment("encode error")
        }))
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE))
}
