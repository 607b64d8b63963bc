//! Session workspace manager: one isolated directory per session.
//!
//! Bindings live in memory only. A session ID maps to exactly one directory
//! for the life of the process, and a directory never moves once created.
//! Several IDs may share a directory: the locally minted ID, the ID a client
//! asked for, and the ID the agent runtime minted for the same conversation.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatehouse_core::ids::new_session_id;
use gatehouse_core::metric_names::SESSIONS_CREATED_TOTAL;
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::WorkspaceError;

/// Marker seeded into an empty base directory on first boot.
pub const BASE_MARKER_FILE: &str = ".gatehouse";

/// Metadata file seeded into every new session directory.
pub const SESSION_FILE: &str = ".session.json";

const MAX_CREATE_ATTEMPTS: usize = 16;

/// A session bound to its workspace directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWorkspace {
    /// Session ID this binding was recorded under.
    pub session_id: String,
    /// Absolute workspace directory.
    pub workspace_dir: PathBuf,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// Whether the ID was minted by the agent runtime (and so can be resumed).
    #[serde(skip)]
    pub agent_bound: bool,
}

/// Ensure `path` exists, seeding a marker file if it is empty.
///
/// Returns the canonical path. Safe to call on every boot.
pub fn initialize_base(path: &Path) -> Result<PathBuf, WorkspaceError> {
    std::fs::create_dir_all(path).map_err(|e| WorkspaceError::io(path, e))?;
    let mut entries = std::fs::read_dir(path).map_err(|e| WorkspaceError::io(path, e))?;
    if entries.next().is_none() {
        let marker = path.join(BASE_MARKER_FILE);
        let body = format!("created {}\n", Utc::now().to_rfc3339());
        std::fs::write(&marker, body).map_err(|e| WorkspaceError::io(&marker, e))?;
        info!(base_dir = %path.display(), "seeded workspace base directory");
    }
    path.canonicalize().map_err(|e| WorkspaceError::io(path, e))
}

/// Maps session IDs to isolated directories under one base directory.
pub struct SessionWorkspaceManager {
    base_dir: PathBuf,
    sessions: RwLock<HashMap<String, Arc<SessionWorkspace>>>,
}

impl SessionWorkspaceManager {
    /// Initialize `base_dir` and create a manager over it.
    pub fn open(base_dir: &Path) -> Result<Self, WorkspaceError> {
        let base_dir = initialize_base(base_dir)?;
        Ok(Self {
            base_dir,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Canonical base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Look up a binding without creating one.
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionWorkspace>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Number of distinct session IDs bound.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Return the binding for `session_id`, creating one if needed.
    ///
    /// A known ID returns its directory unchanged. An unknown or absent ID gets
    /// a freshly minted session and directory; an unknown ID is also recorded
    /// as an alias so repeated calls with it converge on the same directory.
    /// Concurrent first calls with the same unknown ID all get the first
    /// writer's binding.
    pub fn get_or_create(
        &self,
        session_id: Option<&str>,
    ) -> Result<Arc<SessionWorkspace>, WorkspaceError> {
        let requested = session_id.map(str::trim).filter(|id| !id.is_empty());
        if let Some(existing) = requested.and_then(|id| self.get(id)) {
            return Ok(existing);
        }

        // Directory creation happens outside the lock; only the map insert is
        // serialized.
        let minted = new_session_id();
        let dir = self.create_unique_dir()?;
        let created_at = Utc::now();
        if let Err(e) = seed_session_dir(&dir, &minted, created_at) {
            discard_dir(&dir);
            return Err(e);
        }
        let workspace = Arc::new(SessionWorkspace {
            session_id: minted.clone(),
            workspace_dir: dir,
            created_at,
            agent_bound: false,
        });

        let mut sessions = self.sessions.write();
        if let Some(id) = requested {
            if let Some(existing) = sessions.get(id).cloned() {
                drop(sessions);
                debug!(session_id = id, "lost creation race, discarding directory");
                discard_dir(&workspace.workspace_dir);
                return Ok(existing);
            }
            let _ = sessions.insert(id.to_string(), Arc::clone(&workspace));
        }
        let _ = sessions.insert(minted, Arc::clone(&workspace));
        drop(sessions);

        counter!(SESSIONS_CREATED_TOTAL).increment(1);
        info!(
            session_id = %workspace.session_id,
            requested = requested.unwrap_or(""),
            workspace_dir = %workspace.workspace_dir.display(),
            "session workspace created"
        );
        Ok(workspace)
    }

    /// [`Self::get_or_create`] on the blocking thread pool.
    ///
    /// Async callers use this so directory creation never runs on a runtime
    /// worker.
    pub async fn get_or_create_async(
        self: Arc<Self>,
        session_id: Option<String>,
    ) -> Result<Arc<SessionWorkspace>, WorkspaceError> {
        tokio::task::spawn_blocking(move || self.get_or_create(session_id.as_deref()))
            .await
            .map_err(|e| WorkspaceError::Task(e.to_string()))?
    }

    /// Bind an agent-minted `session_id` onto an existing directory.
    ///
    /// Other IDs already mapped to the directory keep their bindings. Binding
    /// the same ID to the same directory again is a no-op; binding it to a
    /// different directory fails with [`WorkspaceError::Conflict`].
    pub fn rebind(
        &self,
        session_id: &str,
        workspace_dir: &Path,
    ) -> Result<Arc<SessionWorkspace>, WorkspaceError> {
        if !workspace_dir.is_dir() {
            return Err(WorkspaceError::io(
                workspace_dir,
                io::Error::new(io::ErrorKind::NotFound, "workspace directory does not exist"),
            ));
        }

        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(session_id) {
            if existing.workspace_dir == workspace_dir {
                return Ok(Arc::clone(existing));
            }
            return Err(WorkspaceError::Conflict {
                session_id: session_id.to_string(),
                bound: existing.workspace_dir.clone(),
            });
        }

        let created_at = sessions
            .values()
            .find(|s| s.workspace_dir == workspace_dir)
            .map_or_else(Utc::now, |s| s.created_at);
        let workspace = Arc::new(SessionWorkspace {
            session_id: session_id.to_string(),
            workspace_dir: workspace_dir.to_path_buf(),
            created_at,
            agent_bound: true,
        });
        let _ = sessions.insert(session_id.to_string(), Arc::clone(&workspace));
        drop(sessions);

        info!(
            session_id,
            workspace_dir = %workspace_dir.display(),
            "session rebound to agent id"
        );
        Ok(workspace)
    }

    fn create_unique_dir(&self) -> Result<PathBuf, WorkspaceError> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let name = format!(
                "{}-{:08x}",
                Utc::now().format("%Y%m%d-%H%M%S%.3f"),
                rand::random::<u32>()
            );
            let dir = self.base_dir.join(name);
            match std::fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(WorkspaceError::io(&dir, e)),
            }
        }
        Err(WorkspaceError::Exhausted(self.base_dir.clone()))
    }
}

fn seed_session_dir(
    dir: &Path,
    session_id: &str,
    created_at: DateTime<Utc>,
) -> Result<(), WorkspaceError> {
    let path = dir.join(SESSION_FILE);
    let body = serde_json::json!({
        "sessionId": session_id,
        "createdAt": created_at,
    });
    std::fs::write(&path, format!("{body:#}\n")).map_err(|e| WorkspaceError::io(&path, e))
}

fn discard_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "failed to remove unused workspace directory");
    }
}
