//! Script host notification and feed infrastructure.
//!
//! - [`NotificationSink`] / [`FeedSink`]: the seams the engine reports
//!   through.
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`; implements both sinks.
//! - [`FeedLog`]: bounded in-memory history of feed items.
//! - [`TracingSink`]: sink that only logs.

pub mod bus;
pub mod feed;
pub mod sink;

pub use bus::{EventBus, HostEvent};
pub use feed::{FeedItem, FeedLog};
pub use sink::{FeedSink, NotificationSink, TracingSink};
