//! In-process progress publisher.
//!
//! [`ProgressHub`] keeps one [`ProgressSink`] per subscriber. Publishing
//! writes the snapshot to every sink synchronously; a sink that fails (its
//! connection is gone, or its buffer is full) is logged and skipped without
//! affecting the others. Sinks are removed only by
//! [`ProgressHub::unsubscribe`], which the subscriber calls on its own
//! disconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use callboard_core::import::ProgressSnapshot;
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Opaque id of a registered subscriber.
pub type SubscriberId = u64;

/// Snapshots buffered per channel subscriber before updates are dropped.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Why a sink did not accept a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("subscriber connection closed")]
    Closed,

    /// The subscriber is not keeping up; this snapshot is dropped.
    #[error("subscriber buffer full")]
    Full,
}

/// Transport-specific write of a progress snapshot.
pub trait ProgressSink: Send + Sync {
    fn send(&self, snapshot: &ProgressSnapshot) -> Result<(), SinkError>;
}

/// Sink that forwards snapshots into a bounded channel without waiting.
pub struct ChannelSink(mpsc::Sender<ProgressSnapshot>);

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<ProgressSnapshot>) -> Self {
        Self(sender)
    }
}

impl ProgressSink for ChannelSink {
    fn send(&self, snapshot: &ProgressSnapshot) -> Result<(), SinkError> {
        self.0.try_send(snapshot.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

// ---------------------------------------------------------------------------
// ProgressHub
// ---------------------------------------------------------------------------

/// Registry of progress subscribers.
///
/// Designed to be shared as `Arc<ProgressHub>` between the import job and the
/// streaming endpoint.
pub struct ProgressHub {
    sinks: RwLock<HashMap<SubscriberId, Box<dyn ProgressSink>>>,
    next_id: AtomicU64,
}

impl ProgressHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self {
            sinks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a sink and return its id.
    pub fn register(&self, sink: Box<dyn ProgressSink>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sinks.write().insert(id, sink);
        tracing::debug!(subscriber_id = id, "Progress subscriber registered");
        id
    }

    /// Register a channel-backed subscriber buffering up to
    /// [`SUBSCRIBER_BUFFER`] snapshots.
    ///
    /// The returned subscription unregisters itself when dropped.
    pub fn subscribe(self: &Arc<Self>) -> ProgressSubscription {
        self.subscribe_with_buffer(SUBSCRIBER_BUFFER)
    }

    /// Like [`subscribe`](Self::subscribe) with an explicit buffer size.
    ///
    /// While the buffer is full, published snapshots are dropped for this
    /// subscriber only. Each snapshot carries the full job state, so the
    /// next one that fits brings the reader up to date.
    pub fn subscribe_with_buffer(self: &Arc<Self>, buffer: usize) -> ProgressSubscription {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = self.register(Box::new(ChannelSink::new(tx)));
        ProgressSubscription {
            id,
            hub: Arc::clone(self),
            receiver: rx,
        }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.sinks.write().remove(&id).is_some() {
            tracing::debug!(subscriber_id = id, "Progress subscriber removed");
        }
    }

    /// Write `snapshot` to every subscriber.
    ///
    /// Returns the number of sinks that accepted it. Failures are logged per
    /// sink and never propagate.
    pub fn publish(&self, snapshot: &ProgressSnapshot) -> usize {
        let sinks = self.sinks.read();
        let mut delivered = 0;
        for (id, sink) in sinks.iter() {
            match sink.send(snapshot) {
                Ok(()) => delivered += 1,
                Err(SinkError::Full) => {
                    tracing::debug!(subscriber_id = id, "Progress subscriber lagging, update dropped");
                }
                Err(e) => {
                    tracing::warn!(subscriber_id = id, error = %e, "Failed to send progress update");
                }
            }
        }
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Drop every sink so channel-backed subscribers observe end-of-stream.
    ///
    /// Used during graceful shutdown.
    pub fn shutdown_all(&self) {
        let mut sinks = self.sinks.write();
        let count = sinks.len();
        sinks.clear();
        tracing::info!(count, "Closed all progress subscribers");
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ProgressSubscription
// ---------------------------------------------------------------------------

/// A channel-backed subscriber created by [`ProgressHub::subscribe`].
pub struct ProgressSubscription {
    id: SubscriberId,
    hub: Arc<ProgressHub>,
    receiver: mpsc::Receiver<ProgressSnapshot>,
}

impl ProgressSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next snapshot. `None` once the hub dropped this sink.
    pub async fn recv(&mut self) -> Option<ProgressSnapshot> {
        self.receiver.recv().await
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use callboard_core::import::ImportStatus;

    struct DeadSink;

    impl ProgressSink for DeadSink {
        fn send(&self, _snapshot: &ProgressSnapshot) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    fn snapshot(processed: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            status: ImportStatus::Processing,
            processed_rows: processed,
            ..ProgressSnapshot::default()
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_published_snapshot() {
        let hub = Arc::new(ProgressHub::new());
        let mut sub1 = hub.subscribe();
        let mut sub2 = hub.subscribe();

        assert_eq!(hub.publish(&snapshot(3)), 2);

        assert_eq!(sub1.recv().await.unwrap().processed_rows, 3);
        assert_eq!(sub2.recv().await.unwrap().processed_rows, 3);
    }

    #[tokio::test]
    async fn dead_sink_does_not_block_others() {
        let hub = Arc::new(ProgressHub::new());
        hub.register(Box::new(DeadSink));
        let mut live = hub.subscribe();

        assert_eq!(hub.publish(&snapshot(1)), 1);
        assert_eq!(live.recv().await.unwrap().processed_rows, 1);
        // The failing sink stays registered until it unsubscribes itself.
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_updates_without_growing() {
        let hub = Arc::new(ProgressHub::new());
        let mut slow = hub.subscribe_with_buffer(2);
        let mut fast = hub.subscribe();

        assert_eq!(hub.publish(&snapshot(1)), 2);
        assert_eq!(hub.publish(&snapshot(2)), 2);
        // Only the fast subscriber has room for the third update.
        assert_eq!(hub.publish(&snapshot(3)), 1);

        assert_eq!(slow.recv().await.unwrap().processed_rows, 1);
        assert_eq!(slow.recv().await.unwrap().processed_rows, 2);
        assert_eq!(hub.publish(&snapshot(4)), 2);
        assert_eq!(slow.recv().await.unwrap().processed_rows, 4);

        for expected in 1..=4 {
            assert_eq!(fast.recv().await.unwrap().processed_rows, expected);
        }
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let hub = Arc::new(ProgressHub::new());
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(&snapshot(0)), 0);
    }

    #[test]
    fn unsubscribe_unknown_id_is_noop() {
        let hub = ProgressHub::new();
        hub.register(Box::new(DeadSink));
        hub.unsubscribe(999);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn shutdown_all_ends_subscriptions() {
        let hub = Arc::new(ProgressHub::new());
        let mut sub = hub.subscribe();

        hub.shutdown_all();

        assert_eq!(hub.subscriber_count(), 0);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let hub = ProgressHub::default();
        assert_eq!(hub.publish(&snapshot(0)), 0);
    }
}
