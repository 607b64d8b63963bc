//! Per-invocation configuration handed to the agent runtime.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Env var carrying the broker base URL to the permission proxy.
pub const BROKER_URL_ENV: &str = "GATEHOUSE_BROKER_URL";
/// Env var carrying the session workspace directory to the permission proxy.
pub const SESSION_DIR_ENV: &str = "GATEHOUSE_SESSION_DIR";
/// Env var carrying the proxy's HTTP wait, in seconds.
pub const PROXY_TIMEOUT_ENV: &str = "GATEHOUSE_PROXY_TIMEOUT_SECS";

/// How the agent runtime should launch the tool permission proxy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCallbackTarget {
    /// Executable to run.
    pub command: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment for this call only.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Everything one agent invocation needs.
///
/// Built fresh for each call, so concurrent invocations never share
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCall {
    /// User prompt for this turn.
    pub prompt: String,
    /// Root the agent may work in. Always the session workspace.
    pub working_directory: PathBuf,
    /// Where tool permission prompts go.
    pub permission_callback: PermissionCallbackTarget,
    /// Directories beyond `working_directory`. Always empty.
    #[serde(default)]
    pub additional_allowed_directories: Vec<PathBuf>,
    /// Agent-minted session to continue, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_session_id: Option<String>,
}

/// Raw turn events from one invocation. Finite, not restartable.
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, AgentError>> + Send>>;

/// An external agent runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Start one invocation. Errors here mean nothing ran.
    async fn invoke(&self, call: AgentCall) -> Result<TurnStream, AgentError>;
}
