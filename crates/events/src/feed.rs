//! Feed items and the bounded in-memory feed history.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::bus::HostEvent;
use crate::sink::FeedSink;

/// Default number of feed items retained by [`FeedLog`].
pub const DEFAULT_FEED_CAPACITY: usize = 100;

/// One human-readable feed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// FeedLog
// ---------------------------------------------------------------------------

/// Keeps the most recent feed items, oldest dropped first.
#[derive(Debug)]
pub struct FeedLog {
    capacity: usize,
    items: Mutex<VecDeque<FeedItem>>,
}

impl FeedLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, item: FeedItem) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if items.len() == self.capacity {
            items.pop_front();
        }
        items.push_back(item);
    }

    /// Retained items, newest first.
    pub fn recent(&self) -> Vec<FeedItem> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect feed items from a bus subscription until the bus closes.
    pub async fn run(self: std::sync::Arc<Self>, mut rx: broadcast::Receiver<HostEvent>) {
        loop {
            match rx.recv().await {
                Ok(HostEvent::Feed(item)) => self.push(item),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Feed log lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, feed log stopping");
                    break;
                }
            }
        }
    }
}

impl Default for FeedLog {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl FeedSink for FeedLog {
    fn add_item(&self, item: FeedItem) {
        self.push(item);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bus::EventBus;

    #[test]
    fn keeps_newest_first_and_drops_oldest() {
        let log = FeedLog::new(2);
        log.push(FeedItem::new("one", ""));
        log.push(FeedItem::new("two", ""));
        log.push(FeedItem::new("three", ""));

        let titles: Vec<String> = log.recent().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["three", "two"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn new_items_get_distinct_ids() {
        let a = FeedItem::new("a", "b");
        let b = FeedItem::new("a", "b");
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn run_collects_feed_events_only() {
        let bus = EventBus::default();
        let log = Arc::new(FeedLog::default());
        let handle = tokio::spawn(Arc::clone(&log).run(bus.subscribe()));

        bus.publish(HostEvent::Notification {
            source: "x".to_string(),
            message: "ignored".to_string(),
        });
        bus.publish(HostEvent::Feed(FeedItem::new("digest", "body")));
        drop(bus);

        handle.await.expect("feed log task");
        let items = log.recent();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "digest");
    }
}
