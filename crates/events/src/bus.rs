//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`HostEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` and doubles as the
//! engine's notification and feed sink.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::feed::FeedItem;
use crate::sink::{FeedSink, NotificationSink};

// ---------------------------------------------------------------------------
// HostEvent
// ---------------------------------------------------------------------------

/// Something that happened inside the script host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    /// A free-text notification from a script or the host itself.
    Notification { source: String, message: String },
    /// A digest entry for the feed.
    Feed(FeedItem),
    /// A script invocation finished (in any state).
    ScriptRun {
        filename: String,
        status: String,
        duration_ms: u64,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use scripthost_events::bus::{EventBus, HostEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(HostEvent::Notification {
///     source: "demo.script".into(),
///     message: "hello".into(),
/// });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<HostEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: HostEvent) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, source: &str, message: &str) {
        tracing::info!(source, message, "Notification");
        self.publish(HostEvent::Notification {
            source: source.to_string(),
            message: message.to_string(),
        });
    }
}

impl FeedSink for EventBus {
    fn add_item(&self, item: FeedItem) {
        tracing::info!(title = %item.title, "Feed item published");
        self.publish(HostEvent::Feed(item));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.notify("demo.script", "hello world");

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(
            received,
            HostEvent::Notification {
                source: "demo.script".to_string(),
                message: "hello world".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_feed_item() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.add_item(FeedItem::new("Ran scripts 50 times", "..."));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
        assert!(matches!(e1, HostEvent::Feed(ref item) if item.title == "Ran scripts 50 times"));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(HostEvent::ScriptRun {
            filename: "orphan".to_string(),
            status: "completed".to_string(),
            duration_ms: 1,
        });
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = HostEvent::ScriptRun {
            filename: "a.script".to_string(),
            status: "timed_out".to_string(),
            duration_ms: 5000,
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["kind"], "script_run");
        assert_eq!(json["filename"], "a.script");
    }
}
