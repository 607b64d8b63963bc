//! Permission prompt → broker round trip → tool decision. Fail-closed.

use std::path::PathBuf;

use gatehouse_core::ToolDecision;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::BrokerClient;
use crate::rewrite::{rewrite_temp_paths, untrusted_fields};
use crate::translate::translate;

/// Answers permission prompts for one session workspace.
#[derive(Clone)]
pub struct PermissionPrompt {
    client: BrokerClient,
    workspace_dir: Option<PathBuf>,
}

impl PermissionPrompt {
    /// Create a prompt handler. Without a workspace, approvals that touch a
    /// temp path are turned into denials.
    pub fn new(client: BrokerClient, workspace_dir: Option<PathBuf>) -> Self {
        Self {
            client,
            workspace_dir,
        }
    }

    /// Decide a prompt. Any failure along the way becomes a denial.
    pub async fn decide(&self, args: &Value) -> ToolDecision {
        let translated = match translate(args) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "rejecting unreadable permission prompt");
                return ToolDecision::deny(e.to_string());
            }
        };
        let action = translated.submission.action.clone();

        let decision = match self.client.request_permission(&translated.submission).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(action = %action, error = %e, "broker round trip failed, denying");
                return ToolDecision::deny(format!("Permission check failed: {e}"));
            }
        };

        if !decision.approved {
            info!(action = %action, reason = %decision.reason, "permission denied");
            return ToolDecision::deny(decision.reason);
        }

        let mut input = translated.input;
        if let Some(input) = input.as_mut() {
            match self.workspace_dir.as_deref() {
                Some(workspace) => {
                    let _ = rewrite_temp_paths(input, workspace);
                }
                None => {
                    let fields = untrusted_fields(input);
                    if !fields.is_empty() {
                        warn!(action = %action, ?fields, "approved temp path with no session workspace, denying");
                        return ToolDecision::deny(format!(
                            "{action} targets a shared temp directory and no session workspace is configured"
                        ));
                    }
                }
            }
        }
        info!(action = %action, "permission approved");
        ToolDecision::Allow {
            updated_input: input,
        }
    }
}
