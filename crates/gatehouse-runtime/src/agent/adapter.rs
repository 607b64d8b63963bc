//! Agent invocation adapter.
//!
//! Drives one agent call end to end: resolves the session workspace, builds
//! the per-call [`AgentCall`], normalizes the runtime's turn events into
//! [`ChatEvent`]s, and binds agent-minted session IDs onto the workspace.
//!
//! Every stream ends with exactly one terminal event: `done` on success,
//! `error` on failure.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use gatehouse_core::ChatEvent;
use gatehouse_core::metric_names::CHAT_INVOCATIONS_TOTAL;
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use super::call::{
    AgentCall, AgentRuntime, BROKER_URL_ENV, PROXY_TIMEOUT_ENV, PermissionCallbackTarget,
    SESSION_DIR_ENV,
};
use super::normalize::{TurnEvent, normalize, push_text};
use crate::errors::{AgentError, WorkspaceError};
use crate::workspace::{SessionWorkspace, SessionWorkspaceManager};

/// Normalized event stream for one invocation.
pub type ChatStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// How the adapter tells the agent runtime to reach the permission proxy.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Broker base URL, as seen from the proxy.
    pub broker_url: String,
    /// Proxy executable.
    pub proxy_command: String,
    /// Proxy arguments.
    pub proxy_args: Vec<String>,
    /// Proxy HTTP wait in seconds.
    pub proxy_timeout_secs: u64,
}

/// Result of a drained, non-streaming invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOutcome {
    /// Text events joined with blank lines.
    pub text: String,
    /// Final session ID.
    pub session_id: Option<String>,
}

/// Runs agent invocations against one runtime and workspace manager.
pub struct AgentInvocationAdapter {
    runtime: Arc<dyn AgentRuntime>,
    workspaces: Arc<SessionWorkspaceManager>,
    config: AdapterConfig,
}

impl AgentInvocationAdapter {
    /// Create an adapter.
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        workspaces: Arc<SessionWorkspaceManager>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            runtime,
            workspaces,
            config,
        }
    }

    /// The workspace manager sessions are resolved against.
    pub fn workspaces(&self) -> &Arc<SessionWorkspaceManager> {
        &self.workspaces
    }

    /// Start an invocation and return its normalized event stream.
    ///
    /// Missing prompts and workspace failures are returned before anything
    /// runs. Failures after that arrive as a single `error` event.
    #[instrument(skip_all, fields(session_id = session_id.unwrap_or("")))]
    pub async fn invoke(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<ChatStream, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::Validation("prompt is required".into()));
        }
        let workspace = Arc::clone(&self.workspaces)
            .get_or_create_async(session_id.map(str::to_string))
            .await?;
        let call = self.build_call(prompt, &workspace);
        debug!(
            session_id = %workspace.session_id,
            resume = call.resume_session_id.is_some(),
            "starting agent invocation"
        );

        let runtime = Arc::clone(&self.runtime);
        let workspaces = Arc::clone(&self.workspaces);
        let stream = async_stream::stream! {
            let mut current = workspace.session_id.clone();
            let mut turns = match runtime.invoke(call).await {
                Ok(turns) => turns,
                Err(e) => {
                    warn!(error = %e, "agent runtime failed to start");
                    counter!(CHAT_INVOCATIONS_TOTAL, "status" => "error").increment(1);
                    yield ChatEvent::Error { message: e.to_string() };
                    return;
                }
            };

            while let Some(item) = turns.next().await {
                let value = match item {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(session_id = %current, error = %e, "agent invocation failed");
                        counter!(CHAT_INVOCATIONS_TOTAL, "status" => "error").increment(1);
                        yield ChatEvent::Error { message: e.to_string() };
                        return;
                    }
                };
                match normalize(&value) {
                    Some(TurnEvent::Text(value)) => {
                        yield ChatEvent::Text { value };
                    }
                    Some(TurnEvent::SessionBound(id)) => {
                        bind_agent_session(&workspaces, &workspace, &id).await;
                        current.clone_from(&id);
                        yield ChatEvent::SessionBound { id };
                    }
                    None => {}
                }
            }

            counter!(CHAT_INVOCATIONS_TOTAL, "status" => "ok").increment(1);
            info!(session_id = %current, "agent invocation complete");
            yield ChatEvent::Done { session_id: Some(current) };
        };
        Ok(Box::pin(stream))
    }

    /// Run an invocation to completion and join its text.
    pub async fn complete(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> Result<ChatOutcome, AgentError> {
        let mut stream = self.invoke(prompt, session_id).await?;
        let mut text = String::new();
        let mut final_session = None;
        while let Some(event) = stream.next().await {
            match event {
                ChatEvent::Text { value } => push_text(&mut text, &value),
                ChatEvent::SessionBound { id } => final_session = Some(id),
                ChatEvent::Done { session_id } => final_session = session_id.or(final_session),
                ChatEvent::Error { message } => return Err(AgentError::Upstream(message)),
            }
        }
        Ok(ChatOutcome {
            text,
            session_id: final_session,
        })
    }

    fn build_call(&self, prompt: &str, workspace: &SessionWorkspace) -> AgentCall {
        let workspace_dir = workspace.workspace_dir.display().to_string();
        let env = BTreeMap::from([
            (BROKER_URL_ENV.to_string(), self.config.broker_url.clone()),
            (SESSION_DIR_ENV.to_string(), workspace_dir),
            (
                PROXY_TIMEOUT_ENV.to_string(),
                self.config.proxy_timeout_secs.to_string(),
            ),
        ]);
        AgentCall {
            prompt: prompt.to_string(),
            working_directory: workspace.workspace_dir.clone(),
            permission_callback: PermissionCallbackTarget {
                command: self.config.proxy_command.clone(),
                args: self.config.proxy_args.clone(),
                env,
            },
            additional_allowed_directories: Vec::new(),
            // Locally minted IDs mean nothing to the runtime.
            resume_session_id: workspace
                .agent_bound
                .then(|| workspace.session_id.clone()),
        }
    }
}

async fn bind_agent_session(
    workspaces: &Arc<SessionWorkspaceManager>,
    workspace: &SessionWorkspace,
    id: &str,
) {
    if workspaces
        .get(id)
        .is_some_and(|bound| bound.workspace_dir == workspace.workspace_dir)
    {
        return;
    }
    let manager = Arc::clone(workspaces);
    let session_id = id.to_string();
    let dir = workspace.workspace_dir.clone();
    let result = tokio::task::spawn_blocking(move || manager.rebind(&session_id, &dir))
        .await
        .map_err(|e| WorkspaceError::Task(e.to_string()))
        .and_then(|r| r);
    if let Err(e) = result {
        warn!(session_id = id, error = %e, "could not bind agent session id");
    }
}
