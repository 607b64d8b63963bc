//! Permission request/response types.
//!
//! All wire types use camelCase JSON to match what the browser and the
//! permission proxy exchange over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reason attached to a request that expired without a human decision.
pub const TIMEOUT_REASON: &str = "Permission request timed out";
/// Reason used when a human approves without saying why.
pub const DEFAULT_APPROVE_REASON: &str = "Approved by user";
/// Reason used when a human denies without saying why.
pub const DEFAULT_DENY_REASON: &str = "Denied by user";

/// Lifecycle state of a permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionStatus {
    /// Waiting for a human decision.
    Pending,
    /// Approved by a human.
    Approved,
    /// Denied by a human.
    Denied,
    /// Expired without a decision (implicit denial).
    TimedOut,
}

impl PermissionStatus {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::TimedOut => "timed-out",
        }
    }
}

/// Input for creating a permission request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSubmission {
    /// Short action name (e.g. a tool name).
    #[serde(default)]
    pub action: String,
    /// Human-readable description of what will happen.
    #[serde(default)]
    pub description: String,
    /// Resource the action touches (path, command, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Open payload forwarded verbatim to observers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A request awaiting (or having received) a human decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Unique, opaque ID.
    pub id: String,
    /// Short action name.
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// Resource the action touches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Open payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Creation time.
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Current status.
    pub status: PermissionStatus,
}

impl PermissionRequest {
    /// Build a pending request from a submission.
    pub fn pending(id: impl Into<String>, submission: PermissionSubmission) -> Self {
        Self {
            id: id.into(),
            action: submission.action,
            description: submission.description,
            resource: submission.resource,
            details: submission.details,
            created_at: Utc::now(),
            status: PermissionStatus::Pending,
        }
    }
}

/// The single accepted answer to a permission request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    /// ID of the request this answers.
    pub request_id: String,
    /// Whether the action may proceed.
    pub approved: bool,
    /// Human-readable reason. Always set for denials.
    pub reason: String,
    /// Resolution time.
    pub resolved_at: DateTime<Utc>,
}

impl PermissionResponse {
    /// Response for an explicit human decision, filling in a default reason.
    pub fn decided(request_id: impl Into<String>, approved: bool, reason: Option<String>) -> Self {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| {
                if approved {
                    DEFAULT_APPROVE_REASON.to_string()
                } else {
                    DEFAULT_DENY_REASON.to_string()
                }
            });
        Self {
            request_id: request_id.into(),
            approved,
            reason,
            resolved_at: Utc::now(),
        }
    }

    /// Response for a request whose deadline elapsed.
    pub fn timed_out(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: false,
            reason: TIMEOUT_REASON.to_string(),
            resolved_at: Utc::now(),
        }
    }

    /// The decision handed back to whoever submitted the request.
    pub fn decision(&self) -> PermissionDecision {
        PermissionDecision {
            approved: self.approved,
            reason: self.reason.clone(),
        }
    }
}

/// Outcome returned to the submitter of a permission request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    /// Whether the action may proceed.
    pub approved: bool,
    /// Human-readable reason.
    pub reason: String,
}

/// Decision shape the agent runtime expects from its permission callback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "behavior", rename_all = "lowercase")]
pub enum ToolDecision {
    /// Let the tool call proceed, optionally with rewritten input.
    Allow {
        /// Input the tool should run with instead of the original.
        #[serde(rename = "updatedInput", default, skip_serializing_if = "Option::is_none")]
        updated_input: Option<Value>,
    },
    /// Block the tool call.
    Deny {
        /// Why the call was blocked.
        message: String,
    },
}

impl ToolDecision {
    /// Deny with the given message.
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny {
            message: message.into(),
        }
    }

    /// Whether this decision allows the call.
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }
}
