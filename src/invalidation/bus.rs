//! Invalidation bus.
//!
//! Publish/subscribe channel shared by every execution context. Delivery is
//! best effort and at most once: publishing never blocks, a signal sent while
//! nobody listens is dropped, and a lagging subscriber skips what it missed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::invalidation::events::{ChangeType, DataType, KeyGroup};

/// Identifies one execution context (one tab, one worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u64);

// == Invalidation Signal ==
/// Marker published after a local invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationSignal {
    pub origin: ContextId,
    pub group: KeyGroup,
    pub data_type: DataType,
    pub change_type: ChangeType,
    /// Unix milliseconds
    pub timestamp: u64,
}

// == Invalidation Bus ==
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<InvalidationSignal>,
    next_context: Arc<AtomicU64>,
}

impl InvalidationBus {
    /// Creates a bus buffering up to `capacity` signals per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_context: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Hands out a fresh context id.
    pub fn register_context(&self) -> ContextId {
        ContextId(self.next_context.fetch_add(1, Ordering::SeqCst))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationSignal> {
        self.sender.subscribe()
    }

    /// Publishes a signal. Returns how many subscribers it reached; failures
    /// are swallowed.
    pub fn publish(&self, signal: InvalidationSignal) -> usize {
        match self.sender.send(signal) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(signal)) => {
                debug!(
                    "No subscribers for invalidation of '{}', signal dropped",
                    signal.group
                );
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(origin: ContextId) -> InvalidationSignal {
        InvalidationSignal {
            origin,
            group: KeyGroup::UserData,
            data_type: DataType::MathlabRole,
            change_type: ChangeType::Update,
            timestamp: 0,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_swallowed() {
        let bus = InvalidationBus::new(8);
        let origin = bus.register_context();

        assert_eq!(bus.publish(signal(origin)), 0);
    }

    #[test]
    fn test_context_ids_are_unique() {
        let bus = InvalidationBus::new(8);
        let other = bus.clone();

        assert_ne!(bus.register_context(), other.register_context());
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        let bus = InvalidationBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let origin = bus.register_context();

        assert_eq!(bus.publish(signal(origin)), 2);

        assert_eq!(first.recv().await.unwrap().origin, origin);
        assert_eq!(second.recv().await.unwrap().origin, origin);
    }

    #[test]
    fn test_signal_serializes_group_as_namespace() {
        let json = serde_json::to_string(&signal(ContextId(3))).unwrap();
        assert!(json.contains(r#""group":"userData""#));
    }
}
