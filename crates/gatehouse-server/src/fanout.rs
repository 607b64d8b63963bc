//! Transport fan-out: broker events mirrored to every connected observer.
//!
//! Each observer gets its own bus subscription, so a slow or broken observer
//! is evicted without stalling anyone else. A stream opens with a
//! `connected` frame, then the pending snapshot (if any), then live frames.
//! It ends when the observer disconnects, when it is evicted, or on shutdown.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::Stream;
use gatehouse_core::ObserverFrame;
use gatehouse_runtime::broker::PermissionBroker;
use metrics::gauge;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::OBSERVER_CONNECTIONS_ACTIVE;

/// Frames for one observer.
pub type ObserverStream = Pin<Box<dyn Stream<Item = ObserverFrame> + Send>>;

/// Opens observer streams over a broker.
pub struct TransportFanout {
    broker: PermissionBroker,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl TransportFanout {
    /// Create a fan-out that closes its streams when `shutdown` fires.
    pub fn new(broker: PermissionBroker, shutdown: CancellationToken) -> Self {
        Self {
            broker,
            shutdown,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of open observer streams.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Open a stream for a new observer.
    pub fn open(&self) -> ObserverStream {
        let (snapshot, mut subscription) = self.broker.subscribe();
        let subscriber_id = subscription.id().to_string();
        let guard = ConnectionGuard::new(Arc::clone(&self.active));
        let shutdown = self.shutdown.clone();
        info!(subscriber_id = %subscriber_id, pending = snapshot.len(), "observer connected");

        Box::pin(async_stream::stream! {
            let _guard = guard;
            yield ObserverFrame::Connected { subscriber_id: subscriber_id.clone() };
            if !snapshot.is_empty() {
                yield ObserverFrame::PendingPermissions { requests: snapshot };
            }
            loop {
                let next = tokio::select! {
                    event = subscription.recv() => event,
                    () = shutdown.cancelled() => None,
                };
                match next {
                    Some(event) => {
                        yield ObserverFrame::from(event);
                    }
                    None => break,
                }
            }
            debug!(subscriber_id = %subscriber_id, "observer stream closed");
        })
    }
}

/// Tracks one open stream; decrements on drop, whichever way the stream ends.
struct ConnectionGuard {
    active: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        let now = active.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!(OBSERVER_CONNECTIONS_ACTIVE).set(now as f64);
        Self { active }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let now = self.active.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        gauge!(OBSERVER_CONNECTIONS_ACTIVE).set(now as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use futures::StreamExt;
    use gatehouse_core::PermissionSubmission;
    use std::time::Duration;

    fn spawn_submit(broker: &PermissionBroker, action: &str) {
        let broker = broker.clone();
        let submission = PermissionSubmission {
            action: action.into(),
            description: "test".into(),
            ..Default::default()
        };
        drop(tokio::spawn(async move { broker.submit(submission).await }));
    }

    async fn until_pending(broker: &PermissionBroker, n: usize) {
        while broker.pending_count() < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn first_frame_is_connected_without_snapshot_when_idle() {
        let broker = PermissionBroker::default();
        let fanout = TransportFanout::new(broker.clone(), CancellationToken::new());
        let mut stream = fanout.open();

        assert_matches!(stream.next().await, Some(ObserverFrame::Connected { subscriber_id }) if subscriber_id.starts_with("sub_"));

        spawn_submit(&broker, "Write");
        assert_matches!(
            stream.next().await,
            Some(ObserverFrame::PermissionRequest { request }) if request.action == "Write"
        );
    }

    #[tokio::test]
    async fn snapshot_follows_connected() {
        let broker = PermissionBroker::default();
        for (i, action) in ["A", "B", "C"].into_iter().enumerate() {
            spawn_submit(&broker, action);
            until_pending(&broker, i + 1).await;
        }
        let fanout = TransportFanout::new(broker.clone(), CancellationToken::new());
        let mut stream = fanout.open();

        assert_matches!(stream.next().await, Some(ObserverFrame::Connected { .. }));
        assert_matches!(
            stream.next().await,
            Some(ObserverFrame::PendingPermissions { requests }) if requests.len() == 3
        );

        let id = broker.list_pending()[0].id.clone();
        let _ = broker.resolve(&id, true, None).unwrap();
        assert_matches!(
            stream.next().await,
            Some(ObserverFrame::PermissionResponse { response }) if response.request_id == id
        );
    }

    #[tokio::test]
    async fn each_observer_gets_a_fresh_id() {
        let fanout = TransportFanout::new(PermissionBroker::default(), CancellationToken::new());
        let mut a = fanout.open();
        let mut b = fanout.open();
        let Some(ObserverFrame::Connected { subscriber_id: id_a }) = a.next().await else {
            panic!("expected connected frame");
        };
        let Some(ObserverFrame::Connected { subscriber_id: id_b }) = b.next().await else {
            panic!("expected connected frame");
        };
        assert_ne!(id_a, id_b);
    }

    #[tokio::test]
    async fn dropping_stream_releases_connection() {
        let broker = PermissionBroker::default();
        let fanout = TransportFanout::new(broker.clone(), CancellationToken::new());
        let stream = fanout.open();
        assert_eq!(fanout.connection_count(), 1);
        assert_eq!(broker.bus().subscriber_count(), 1);
        drop(stream);
        assert_eq!(fanout.connection_count(), 0);
        assert_eq!(broker.bus().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_ends_stream() {
        let token = CancellationToken::new();
        let fanout = TransportFanout::new(PermissionBroker::default(), token.clone());
        let mut stream = fanout.open();
        let _ = stream.next().await;
        token.cancel();
        let end = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn evicted_observer_stream_ends_others_continue() {
        let broker = PermissionBroker::new(Duration::from_secs(60), 1);
        let fanout = TransportFanout::new(broker.clone(), CancellationToken::new());
        let mut slow = fanout.open();
        let mut fast = fanout.open();
        let _ = slow.next().await;
        let _ = fast.next().await;

        for (i, action) in ["A", "B", "C"].into_iter().enumerate() {
            spawn_submit(&broker, action);
            until_pending(&broker, i + 1).await;
            assert_matches!(fast.next().await, Some(ObserverFrame::PermissionRequest { .. }));
        }

        assert_matches!(slow.next().await, Some(ObserverFrame::PermissionRequest { request }) if request.action == "A");
        assert!(slow.next().await.is_none());
        assert_eq!(broker.bus().subscriber_count(), 1);
    }
}
