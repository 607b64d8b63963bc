//! Correlation registry: pending permission requests keyed by ID.
//!
//! Each entry owns the single-fire sender that wakes the submitter. Removal
//! hands that sender to the caller, so whoever removes an entry is the only
//! party able to answer it.

use gatehouse_core::{PermissionRequest, PermissionResponse};
use indexmap::IndexMap;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// A pending request plus the means to answer it.
pub struct PendingPermission {
    request: PermissionRequest,
    responder: oneshot::Sender<PermissionResponse>,
    deadline: Option<AbortHandle>,
}

impl PendingPermission {
    /// Create an entry.
    pub fn new(
        request: PermissionRequest,
        responder: oneshot::Sender<PermissionResponse>,
        deadline: Option<AbortHandle>,
    ) -> Self {
        Self {
            request,
            responder,
            deadline,
        }
    }

    /// The stored request.
    pub fn request(&self) -> &PermissionRequest {
        &self.request
    }

    /// Cancel the deadline timer, if one is attached.
    pub fn cancel_deadline(&self) {
        if let Some(handle) = &self.deadline {
            handle.abort();
        }
    }

    /// Deliver the response to the submitter.
    ///
    /// Returns `false` if the submitter has gone away.
    pub fn complete(self, response: PermissionResponse) -> bool {
        self.responder.send(response).is_ok()
    }
}

/// Pending requests in insertion order.
pub struct CorrelationRegistry {
    pending: IndexMap<String, PendingPermission>,
}

impl CorrelationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pending: IndexMap::new(),
        }
    }

    /// Insert an entry. Returns `false` (and keeps the existing entry) if the
    /// ID is already present.
    pub fn insert(&mut self, entry: PendingPermission) -> bool {
        let id = entry.request.id.clone();
        if self.pending.contains_key(&id) {
            return false;
        }
        let _ = self.pending.insert(id, entry);
        true
    }

    /// Look up a pending request.
    pub fn get(&self, id: &str) -> Option<&PermissionRequest> {
        self.pending.get(id).map(PendingPermission::request)
    }

    /// Remove an entry. Succeeds at most once per ID.
    pub fn remove(&mut self, id: &str) -> Option<PendingPermission> {
        self.pending.shift_remove(id)
    }

    /// Check if a request is pending.
    pub fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Clone of all pending requests in insertion order.
    pub fn snapshot(&self) -> Vec<PermissionRequest> {
        self.pending
            .values()
            .map(|p| p.request.clone())
            .collect()
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
