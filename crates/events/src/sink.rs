//! Sink traits the engine reports through.

use crate::feed::FeedItem;

/// Receives free-text notifications (script `__notify`/`__notification.post`
/// calls, run announcements, failures).
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification. `source` names the script or component.
    fn notify(&self, source: &str, message: &str);
}

/// Receives human-readable digest entries.
pub trait FeedSink: Send + Sync {
    fn add_item(&self, item: FeedItem);
}

/// Sink that writes everything to `tracing` and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, source: &str, message: &str) {
        tracing::info!(source, message, "Notification");
    }
}

impl FeedSink for TracingSink {
    fn add_item(&self, item: FeedItem) {
        tracing::info!(title = %item.title, body = %item.body, "Feed item");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
