use std::sync::Arc;

use scripthost_engine::{HttpTransport, Supervisor};
use scripthost_events::{EventBus, FeedLog};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Runs scripts and owns profile and statistics state.
    pub supervisor: Arc<Supervisor>,
    /// Centralized event bus for notifications, feed items, and run events.
    pub event_bus: Arc<EventBus>,
    /// Recent feed items collected from the bus.
    pub feed: Arc<FeedLog>,
}

impl AppState {
    /// Wire the supervisor to a fresh event bus and start collecting feed
    /// items. Must be called inside a Tokio runtime; the returned handle
    /// finishes once every clone of the bus is dropped.
    pub fn build(
        config: ServerConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> (Self, JoinHandle<()>) {
        let event_bus = Arc::new(EventBus::default());
        let feed = Arc::new(FeedLog::default());
        let feed_handle = tokio::spawn(Arc::clone(&feed).run(event_bus.subscribe()));

        let supervisor = Supervisor::new(
            config.host_config.clone(),
            transport,
            event_bus.clone(),
            event_bus.clone(),
        )
        .with_event_bus(Arc::clone(&event_bus));

        let state = Self {
            config: Arc::new(config),
            supervisor: Arc::new(supervisor),
            event_bus,
            feed,
        };
        (state, feed_handle)
    }
}
