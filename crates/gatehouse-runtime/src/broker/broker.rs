//! Permission broker: create, resolve, and list pending requests.
//!
//! `submit` parks its caller until exactly one of two things happens: a
//! matching [`PermissionBroker::resolve`] or the request deadline. Both paths
//! go through the same registry removal under one lock, so a human answer
//! racing the deadline settles the request exactly once.

use std::sync::{Arc, Weak};
use std::time::Duration;

use gatehouse_core::ids::new_permission_id;
use gatehouse_core::metric_names::{
    PERMISSION_REQUESTS_PENDING, PERMISSION_REQUESTS_TOTAL, PERMISSION_RESOLUTIONS_TOTAL,
};
use gatehouse_core::{
    BrokerEvent, PermissionDecision, PermissionRequest, PermissionResponse, PermissionSubmission,
};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use super::bus::{EventBus, Subscription};
use super::registry::{CorrelationRegistry, PendingPermission};
use crate::errors::BrokerError;

/// Default deadline for a human decision.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

struct BrokerInner {
    registry: Mutex<CorrelationRegistry>,
    bus: EventBus,
    timeout: Duration,
}

impl BrokerInner {
    /// Remove `id` and answer it. The single place a request is settled.
    fn settle(&self, id: &str, make: impl FnOnce() -> PermissionResponse) -> Option<PermissionResponse> {
        let mut registry = self.registry.lock();
        let entry = registry.remove(id)?;
        entry.cancel_deadline();
        let response = make();
        let _ = self.bus.publish(&BrokerEvent::RequestResolved {
            response: response.clone(),
        });
        gauge!(PERMISSION_REQUESTS_PENDING).set(registry.len() as f64);
        if !entry.complete(response.clone()) {
            debug!(request_id = id, "submitter gone before resolution");
        }
        Some(response)
    }
}

/// Human-in-the-loop permission broker. Cheap to clone.
#[derive(Clone)]
pub struct PermissionBroker {
    inner: Arc<BrokerInner>,
}

impl PermissionBroker {
    /// Create a broker with the given deadline and per-observer queue size.
    pub fn new(timeout: Duration, observer_buffer: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                registry: Mutex::new(CorrelationRegistry::new()),
                bus: EventBus::with_capacity(observer_buffer),
                timeout,
            }),
        }
    }

    /// Deadline applied to every request.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Submit a request and wait for its outcome.
    ///
    /// Resolves with the human decision, or with an implicit denial once the
    /// deadline passes. Rejects empty `action`/`description` without side
    /// effects.
    #[instrument(skip_all, fields(action = %submission.action))]
    pub async fn submit(
        &self,
        submission: PermissionSubmission,
    ) -> Result<PermissionDecision, BrokerError> {
        if submission.action.trim().is_empty() {
            return Err(BrokerError::Validation("action is required".into()));
        }
        if submission.description.trim().is_empty() {
            return Err(BrokerError::Validation("description is required".into()));
        }

        let id = new_permission_id();
        let request = PermissionRequest::pending(id.clone(), submission);
        let (tx, rx) = oneshot::channel();
        {
            let mut registry = self.inner.registry.lock();
            let deadline = tokio::spawn(expire_after(
                Arc::downgrade(&self.inner),
                id.clone(),
                self.inner.timeout,
            ));
            let _ = registry.insert(PendingPermission::new(
                request.clone(),
                tx,
                Some(deadline.abort_handle()),
            ));
            gauge!(PERMISSION_REQUESTS_PENDING).set(registry.len() as f64);
            let _ = self.inner.bus.publish(&BrokerEvent::RequestCreated { request });
        }
        counter!(PERMISSION_REQUESTS_TOTAL).increment(1);
        info!(request_id = %id, "permission request created");

        let decision = match rx.await {
            Ok(response) => response.decision(),
            // Sender dropped without an answer; fail closed.
            Err(_) => PermissionResponse::timed_out(&id).decision(),
        };
        debug!(request_id = %id, approved = decision.approved, "permission request settled");
        Ok(decision)
    }

    /// Answer a pending request. The first answer wins; later ones get
    /// [`BrokerError::NotFound`] and change nothing.
    #[instrument(skip(self, reason))]
    pub fn resolve(
        &self,
        id: &str,
        approved: bool,
        reason: Option<String>,
    ) -> Result<PermissionResponse, BrokerError> {
        let response = self
            .inner
            .settle(id, || PermissionResponse::decided(id, approved, reason))
            .ok_or_else(|| BrokerError::NotFound(id.to_string()))?;
        let outcome = if approved { "approved" } else { "denied" };
        counter!(PERMISSION_RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
        info!(request_id = id, outcome, "permission request resolved");
        Ok(response)
    }

    /// Pending requests in creation order.
    pub fn list_pending(&self) -> Vec<PermissionRequest> {
        self.inner.registry.lock().snapshot()
    }

    /// Number of pending requests.
    pub fn pending_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Whether `id` is still pending.
    pub fn is_pending(&self, id: &str) -> bool {
        self.inner.registry.lock().contains(id)
    }

    /// Subscribe to broker events, returning the pending snapshot taken
    /// atomically with the subscription: every request is either in the
    /// snapshot or arrives as a live event, never both, never neither.
    pub fn subscribe(&self) -> (Vec<PermissionRequest>, Subscription) {
        let registry = self.inner.registry.lock();
        let subscription = self.inner.bus.subscribe();
        (registry.snapshot(), subscription)
    }

    /// The underlying event bus.
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

impl Default for PermissionBroker {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT, super::bus::DEFAULT_CAPACITY)
    }
}

async fn expire_after(inner: Weak<BrokerInner>, id: String, timeout: Duration) {
    tokio::time::sleep(timeout).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    if inner
        .settle(&id, || PermissionResponse::timed_out(&id))
        .is_some()
    {
        counter!(PERMISSION_RESOLUTIONS_TOTAL, "outcome" => "timed-out").increment(1);
        warn!(request_id = %id, timeout_secs = timeout.as_secs(), "permission request timed out");
    }
}
