//! Runtime error types.

use std::path::PathBuf;

/// Errors from the permission broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Required input missing or empty. No side effect occurred.
    #[error("validation error: {0}")]
    Validation(String),

    /// No pending request with this ID (unknown or already resolved).
    #[error("permission request not found: {0}")]
    NotFound(String),
}

/// Errors from the session workspace manager.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Filesystem operation failed.
    #[error("workspace I/O error at {path}: {source}")]
    Io {
        /// Path being operated on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The session ID is already bound to a different directory.
    #[error("session {session_id} is already bound to {bound}")]
    Conflict {
        /// Session ID that was being bound.
        session_id: String,
        /// Directory it is bound to.
        bound: PathBuf,
    },

    /// Could not find a free directory name.
    #[error("could not allocate a unique workspace directory under {0}")]
    Exhausted(PathBuf),

    /// The blocking filesystem task panicked or was cancelled.
    #[error("workspace task failed: {0}")]
    Task(String),
}

impl WorkspaceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from an agent invocation.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Missing prompt. Rejected before anything runs.
    #[error("validation error: {0}")]
    Validation(String),

    /// Workspace could not be prepared.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// The agent runtime could not be started.
    #[error("failed to start agent runtime: {0}")]
    Spawn(String),

    /// The agent runtime failed mid-turn.
    #[error("agent runtime error: {0}")]
    Upstream(String),
}
