//! Shared fixtures for the engine's unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scripthost_core::body::Body;
use scripthost_core::request::{Headers, WireRequest, WireResponse};
use scripthost_events::{FeedItem, FeedSink, NotificationSink};

use crate::transport::{HttpTransport, TransportError};

pub fn response(status: u16, body: Body) -> WireResponse {
    let mut headers = Headers::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    WireResponse {
        status,
        headers,
        body,
    }
}

/// Transport that replays queued results and records every request.
/// An empty queue answers `200 "ok"`.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<WireResponse, TransportError>>>,
    requests: Mutex<Vec<WireRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, response: WireResponse) {
        self.replies.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_err(&self, err: TransportError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(response(200, Body::from("ok"))))
    }
}

/// Sink that keeps everything it is given.
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<(String, String)>>,
    items: Mutex<Vec<FeedItem>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notifications().into_iter().map(|(_, m)| m).collect()
    }

    pub fn items(&self) -> Vec<FeedItem> {
        self.items.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, source: &str, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((source.to_string(), message.to_string()));
    }
}

impl FeedSink for RecordingSink {
    fn add_item(&self, item: FeedItem) {
        self.items.lock().unwrap().push(item);
    }
}

/// In-memory writer for formatted `tracing` output.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriber that writes every event at DEBUG and above into `self`.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let writer = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
