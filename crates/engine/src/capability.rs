//! Host-side implementations of the objects and functions scripts call.
//!
//! Everything here is synchronous and sandbox-agnostic. A [`Sandbox`]
//! implementation decides how each capability is surfaced in its language.
//!
//! [`Sandbox`]: crate::sandbox::Sandbox

use std::sync::{Arc, Mutex};

use scripthost_core::request::{NormalizedResponse, RequestSpec};
use scripthost_core::store::KvStore;
use scripthost_events::NotificationSink;
use serde_json::Value;

use crate::bridge::{BlockingBridge, ClientReply};
use crate::transport::TransportError;

/// `tracing` target for everything a script logs.
pub const SCRIPT_LOG_TARGET: &str = "scripthost::script";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Script console, scoped to one script name.
#[derive(Debug, Clone)]
pub struct Console {
    script: Arc<str>,
}

impl Console {
    pub fn new(script: &str) -> Self {
        Self {
            script: Arc::from(script),
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn emit(&self, level: LogLevel, message: &str) {
        let script = &*self.script;
        match level {
            LogLevel::Debug => tracing::debug!(target: SCRIPT_LOG_TARGET, script, "{message}"),
            LogLevel::Info => tracing::info!(target: SCRIPT_LOG_TARGET, script, "{message}"),
            LogLevel::Warn => tracing::warn!(target: SCRIPT_LOG_TARGET, script, "{message}"),
            LogLevel::Error => tracing::error!(target: SCRIPT_LOG_TARGET, script, "{message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Holds the payload a script passes to `done`. The last call wins.
#[derive(Debug, Clone, Default)]
pub struct CompletionSlot {
    value: Arc<Mutex<Option<Value>>>,
}

impl CompletionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, value: Value) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    pub fn get(&self) -> Option<Value> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

// ---------------------------------------------------------------------------
// HTTP capabilities
// ---------------------------------------------------------------------------

/// Http-client profile `__httpClient` object.
#[derive(Clone)]
pub struct HttpClientCapability {
    bridge: BlockingBridge,
}

impl HttpClientCapability {
    pub fn new(bridge: BlockingBridge) -> Self {
        Self { bridge }
    }

    pub fn get(&self, spec: RequestSpec) -> ClientReply {
        self.bridge.client_get(spec)
    }

    pub fn post(&self, spec: RequestSpec) -> ClientReply {
        self.bridge.client_post(spec)
    }
}

/// Task-fetch profile `__task` object.
#[derive(Clone)]
pub struct TaskCapability {
    bridge: BlockingBridge,
}

impl TaskCapability {
    pub fn new(bridge: BlockingBridge) -> Self {
        Self { bridge }
    }

    pub fn fetch(&self, spec: RequestSpec) -> Result<NormalizedResponse, TransportError> {
        self.bridge.task_fetch(spec)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Key-value access for one script. Failures are logged, never thrown.
#[derive(Debug, Clone)]
pub struct StoreCapability {
    store: Arc<KvStore>,
    console: Console,
}

impl StoreCapability {
    pub fn new(store: Arc<KvStore>, console: Console) -> Self {
        Self { store, console }
    }

    /// The stored value, or an empty string if none or unreadable.
    pub fn read(&self, key: &str) -> String {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                self.console
                    .emit(LogLevel::Error, &format!("store read '{key}' failed: {err}"));
                String::new()
            }
        }
    }

    /// Returns whether the value was written.
    pub fn write(&self, value: &str, key: &str) -> bool {
        match self.store.put(value, key) {
            Ok(()) => true,
            Err(err) => {
                self.console
                    .emit(LogLevel::Error, &format!("store write '{key}' failed: {err}"));
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Forwards script notifications to the host's notification sink.
#[derive(Clone)]
pub struct NotifyCapability {
    sink: Arc<dyn NotificationSink>,
    script: Arc<str>,
}

impl NotifyCapability {
    pub fn new(sink: Arc<dyn NotificationSink>, script: &str) -> Self {
        Self {
            sink,
            script: Arc::from(script),
        }
    }

    /// Join the parts with single spaces and deliver them.
    pub fn post(&self, parts: &[String]) {
        self.sink.notify(&self.script, &parts.join(" "));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_helpers::RecordingSink;

    #[test]
    fn completion_last_call_wins() {
        let slot = CompletionSlot::new();
        assert_eq!(slot.get(), None);
        slot.record(json!({"n": 1}));
        slot.clone().record(json!("second"));
        assert_eq!(slot.get(), Some(json!("second")));
    }

    #[test]
    fn store_round_trips_and_swallows_bad_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StoreCapability::new(Arc::new(KvStore::new(dir.path())), Console::new("s"));

        assert_eq!(store.read("token"), "");
        assert!(store.write("abc", "token"));
        assert_eq!(store.read("token"), "abc");

        assert!(!store.write("x", "../escape"));
        assert_eq!(store.read("../escape"), "");
    }

    #[test]
    fn notify_joins_parts_with_spaces() {
        let sink = Arc::new(RecordingSink::new());
        let notify = NotifyCapability::new(sink.clone(), "demo.script");

        notify.post(&["title".to_string(), "sub".to_string(), "body".to_string()]);

        assert_eq!(
            sink.notifications(),
            vec![("demo.script".to_string(), "title sub body".to_string())]
        );
    }
}
