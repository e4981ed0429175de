//! Per-invocation execution contexts.
//!
//! A context holds exactly the capabilities a script may touch. Profile
//! capabilities are `None` unless their profile is active, and a sandbox must
//! leave absent capabilities undefined rather than stubbing them.

use std::sync::Arc;

use scripthost_core::external::ExternalContext;
use scripthost_core::profile::{
    ActiveProfiles, CAP_HTTP_CLIENT, CAP_NOTIFICATION, CAP_NOTIFY, CAP_PERSISTENT_STORE,
    CAP_PREFS, CAP_TASK,
};
use scripthost_core::store::KvStore;
use scripthost_events::NotificationSink;
use serde_json::Value;
use tokio::runtime::Handle;

use crate::bridge::{BlockingBridge, HttpBridge};
use crate::capability::{
    CompletionSlot, Console, HttpClientCapability, NotifyCapability, StoreCapability,
    TaskCapability,
};

/// Capabilities present in every context.
pub const BASELINE_CAPABILITIES: [&str; 4] = ["console", "setTimeout", "done", "axios"];

pub struct ExecutionContext {
    pub script_name: String,
    pub console: Console,
    pub completion: CompletionSlot,
    /// Backs the generic `axios` entry point.
    pub http: BlockingBridge,

    // Http-client profile.
    pub http_client: Option<HttpClientCapability>,
    pub persistent_store: Option<StoreCapability>,
    pub notification: Option<NotifyCapability>,

    // Task-fetch profile.
    pub task: Option<TaskCapability>,
    pub prefs: Option<StoreCapability>,
    pub notify: Option<NotifyCapability>,

    /// External bindings in merge order; they shadow everything above.
    pub bindings: Vec<(String, Value)>,
}

impl ExecutionContext {
    /// Names of every capability and binding visible to the script.
    pub fn capability_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = BASELINE_CAPABILITIES.to_vec();
        let optional = [
            (CAP_HTTP_CLIENT, self.http_client.is_some()),
            (CAP_PERSISTENT_STORE, self.persistent_store.is_some()),
            (CAP_NOTIFICATION, self.notification.is_some()),
            (CAP_TASK, self.task.is_some()),
            (CAP_PREFS, self.prefs.is_some()),
            (CAP_NOTIFY, self.notify.is_some()),
        ];
        names.extend(optional.into_iter().filter(|(_, on)| *on).map(|(n, _)| n));
        for (name, _) in &self.bindings {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        names
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capability_names().contains(&name)
    }
}

// ---------------------------------------------------------------------------
// ContextBuilder
// ---------------------------------------------------------------------------

/// Builds one fresh [`ExecutionContext`] per invocation.
pub struct ContextBuilder {
    bridge: Arc<HttpBridge>,
    store: Arc<KvStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ContextBuilder {
    pub fn new(
        bridge: Arc<HttpBridge>,
        store: Arc<KvStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            bridge,
            store,
            notifier,
        }
    }

    /// Assemble a context for `script_name`.
    ///
    /// `runtime` is the handle blocking capability calls are driven on. An
    /// external context is flattened in place before its bindings are
    /// merged.
    pub fn build(
        &self,
        script_name: &str,
        profiles: ActiveProfiles,
        runtime: Handle,
        external: Option<&mut ExternalContext>,
    ) -> ExecutionContext {
        let console = Console::new(script_name);
        let http = BlockingBridge::new(Arc::clone(&self.bridge), runtime);
        let new_store = || StoreCapability::new(Arc::clone(&self.store), console.clone());
        let new_notify = || NotifyCapability::new(Arc::clone(&self.notifier), script_name);

        let (http_client, persistent_store, notification) = if profiles.http_client {
            (
                Some(HttpClientCapability::new(http.clone())),
                Some(new_store()),
                Some(new_notify()),
            )
        } else {
            (None, None, None)
        };

        let (task, prefs, notify) = if profiles.task_fetch {
            (
                Some(TaskCapability::new(http.clone())),
                Some(new_store()),
                Some(new_notify()),
            )
        } else {
            (None, None, None)
        };

        let bindings = match external {
            Some(external) => {
                external.flatten();
                external.bindings()
            }
            None => Vec::new(),
        };

        ExecutionContext {
            script_name: script_name.to_string(),
            console,
            completion: CompletionSlot::new(),
            http,
            http_client,
            persistent_store,
            notification,
            task,
            prefs,
            notify,
            bindings,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
