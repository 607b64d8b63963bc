//! Event types.
//!
//! Three event families:
//!
//! - **[`BrokerEvent`]**: what the broker publishes on its bus when a request
//!   is created or resolved.
//! - **[`ObserverFrame`]**: what a browser observer receives on its stream,
//!   including the `connected` greeting and the pending snapshot.
//! - **[`ChatEvent`]**: the uniform output of one agent invocation after
//!   normalization.

use serde::{Deserialize, Serialize};

use crate::permission::{PermissionRequest, PermissionResponse};

// ─────────────────────────────────────────────────────────────────────────────
// BrokerEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Event published by the permission broker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BrokerEvent {
    /// A new request is waiting for a decision.
    RequestCreated {
        /// The pending request.
        request: PermissionRequest,
    },
    /// A request received its single accepted response.
    RequestResolved {
        /// The accepted response.
        response: PermissionResponse,
    },
}

impl BrokerEvent {
    /// Event kind, as used in logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestCreated { .. } => "request-created",
            Self::RequestResolved { .. } => "request-resolved",
        }
    }

    /// ID of the request this event concerns.
    pub fn request_id(&self) -> &str {
        match self {
            Self::RequestCreated { request } => &request.id,
            Self::RequestResolved { response } => &response.request_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ObserverFrame
// ─────────────────────────────────────────────────────────────────────────────

/// Frame delivered to a permission observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ObserverFrame {
    /// First frame of every subscription.
    #[serde(rename_all = "camelCase")]
    Connected {
        /// Fresh ID for this subscription.
        subscriber_id: String,
    },
    /// Requests already pending when the observer subscribed.
    PendingPermissions {
        /// Pending requests in creation order.
        requests: Vec<PermissionRequest>,
    },
    /// A request was created.
    PermissionRequest {
        /// The new request.
        request: PermissionRequest,
    },
    /// A request was resolved.
    PermissionResponse {
        /// The accepted response.
        response: PermissionResponse,
    },
}

impl From<BrokerEvent> for ObserverFrame {
    fn from(event: BrokerEvent) -> Self {
        match event {
            BrokerEvent::RequestCreated { request } => Self::PermissionRequest { request },
            BrokerEvent::RequestResolved { response } => Self::PermissionResponse { response },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChatEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized output of one agent invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    /// A chunk of assistant text.
    Text {
        /// The text.
        value: String,
    },
    /// The agent runtime announced its own session ID.
    SessionBound {
        /// Agent-minted session ID.
        id: String,
    },
    /// The invocation finished. Emitted exactly once on success.
    #[serde(rename_all = "camelCase")]
    Done {
        /// Final bound session ID, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// The invocation failed. Emitted exactly once on failure.
    Error {
        /// Failure description.
        message: String,
    },
}

impl ChatEvent {
    /// Shorthand for a text event.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
