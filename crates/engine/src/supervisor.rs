//! Central script supervisor.
//!
//! Coordinates script lookup, profile detection, context assembly, sandboxed
//! execution under a deadline, and run accounting. Front ends hold it as an
//! `Arc<Supervisor>`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scripthost_core::external::ExternalContext;
use scripthost_core::profile::{ActiveProfiles, ProfileSwitch};
use scripthost_core::stats::{RunStats, StatsSnapshot};
use scripthost_core::store::KvStore;
use scripthost_events::{EventBus, FeedItem, FeedSink, HostEvent, NotificationSink};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;

use crate::bridge::HttpBridge;
use crate::config::HostConfig;
use crate::context::ContextBuilder;
use crate::library::ScriptLibrary;
use crate::sandbox::{RhaiSandbox, Sandbox, SandboxError};
use crate::transport::HttpTransport;

/// Notification source for messages the host itself emits.
pub const HOST_SOURCE: &str = "scripthost";

/// Extra time the outer timer allows the sandbox to observe its own deadline.
const DEADLINE_GRACE: Duration = Duration::from_millis(100);

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed { error: String },
    TimedOut,
    NotFound,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::TimedOut => "timed_out",
            Self::NotFound => "not_found",
        }
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub filename: String,
    pub status: RunStatus,
    /// The `done` payload, or an empty string if none was recorded.
    pub done: Value,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn is_not_found(&self) -> bool {
        self.status == RunStatus::NotFound
    }
}

/// Runs scripts and owns every piece of process-wide script state.
pub struct Supervisor {
    config: HostConfig,
    library: ScriptLibrary,
    profiles: ProfileSwitch,
    contexts: ContextBuilder,
    sandbox: Arc<dyn Sandbox>,
    stats: RunStats,
    notifier: Arc<dyn NotificationSink>,
    feed: Arc<dyn FeedSink>,
    events: Option<Arc<EventBus>>,
}

impl Supervisor {
    /// Build a supervisor running Rhai scripts over `transport`.
    pub fn new(
        config: HostConfig,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn NotificationSink>,
        feed: Arc<dyn FeedSink>,
    ) -> Self {
        let bridge = Arc::new(HttpBridge::new(transport, config.http_timeout));
        let store = Arc::new(KvStore::new(config.store_dir.clone()));
        Self {
            library: ScriptLibrary::new(config.script_dir.clone()),
            profiles: ProfileSwitch::with_preset(&config.preset_profiles),
            contexts: ContextBuilder::new(bridge, store, Arc::clone(&notifier)),
            sandbox: Arc::new(RhaiSandbox::new()),
            stats: RunStats::new(config.digest_threshold),
            notifier,
            feed,
            events: None,
            config,
        }
    }

    /// Replace the script backend.
    pub fn with_sandbox(mut self, sandbox: Arc<dyn Sandbox>) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Publish a [`HostEvent::ScriptRun`] after every invocation.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn library(&self) -> &ScriptLibrary {
        &self.library
    }

    pub fn active_profiles(&self) -> ActiveProfiles {
        self.profiles.active()
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot().await
    }

    /// Run `filename` and return its `done` payload, or `""`.
    ///
    /// Never fails: every failure is logged and reported through the
    /// notification sink.
    pub async fn run(&self, filename: &str, external: Option<ExternalContext>) -> Value {
        self.run_report(filename, external).await.done
    }

    /// Run `filename` and describe how it went.
    pub async fn run_report(&self, filename: &str, external: Option<ExternalContext>) -> RunReport {
        let started = Instant::now();

        // 1. Load the source.
        let source = match self.library.load(filename).await {
            Ok(source) => source,
            Err(err) => {
                tracing::error!(script = filename, error = %err, "Script load failed");
                self.notifier.notify(HOST_SOURCE, &format!("{filename}: {err}"));
                return self.finish(filename, RunStatus::NotFound, None, started);
            }
        };

        // 2. Detect profiles and assemble a fresh context.
        let profiles = self.profiles.detect(filename, &source);
        let mut external = external;
        let context =
            self.contexts
                .build(filename, profiles, Handle::current(), external.as_mut());
        let completion = context.completion.clone();

        // 3. Announce and execute under the deadline.
        self.notifier
            .notify(HOST_SOURCE, &format!("running script {filename}"));
        tracing::info!(script = filename, ?profiles, "Running script");

        let deadline = Instant::now() + self.config.exec_timeout;
        let sandbox = Arc::clone(&self.sandbox);
        let task = tokio::task::spawn_blocking(move || sandbox.execute(&source, context, deadline));

        let status = match tokio::time::timeout(self.config.exec_timeout + DEADLINE_GRACE, task).await {
            Ok(Ok(Ok(()))) => RunStatus::Completed,
            Ok(Ok(Err(SandboxError::Timeout { .. }))) | Err(_) => RunStatus::TimedOut,
            Ok(Ok(Err(err))) => RunStatus::Failed {
                error: err.to_string(),
            },
            Ok(Err(join_err)) => RunStatus::Failed {
                error: format!("sandbox task failed: {join_err}"),
            },
        };

        match &status {
            RunStatus::TimedOut => {
                tracing::error!(
                    script = filename,
                    timeout_ms = self.config.exec_timeout.as_millis() as u64,
                    "Script timed out"
                );
                self.notifier
                    .notify(HOST_SOURCE, &format!("{filename} timed out"));
            }
            RunStatus::Failed { error } => {
                tracing::error!(script = filename, error = %error, "Script failed");
                self.notifier
                    .notify(HOST_SOURCE, &format!("{filename} failed: {error}"));
            }
            _ => {}
        }

        // 4. Account for the run.
        if let Some(digest) = self.stats.record(filename).await {
            tracing::info!(title = %digest.title, body = %digest.body, "Run statistics digest");
            self.feed.add_item(FeedItem::new(digest.title, digest.body));
        }

        self.finish(filename, status, completion.get(), started)
    }

    fn finish(
        &self,
        filename: &str,
        status: RunStatus,
        done: Option<Value>,
        started: Instant,
    ) -> RunReport {
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(script = filename, status = status.label(), duration_ms, "Run finished");

        if let Some(bus) = &self.events {
            bus.publish(HostEvent::ScriptRun {
                filename: filename.to_string(),
                status: status.label().to_string(),
                duration_ms,
            });
        }

        RunReport {
            filename: filename.to_string(),
            status,
            done: done.unwrap_or_else(|| Value::String(String::new())),
            duration_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
