//! Capability profile detection.
//!
//! Two mutually-targeted capability APIs are supported. A script reveals
//! which one it was written against by the capability names it uses; the
//! first script that reveals a profile switches that profile on for the
//! rest of the process. Each profile is tracked on its own axis, so both
//! can end up enabled at the same time.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Capability names
// ---------------------------------------------------------------------------
//
// Host-injected names carry the reserved `__` prefix so they never collide
// with a script's own variables. Any other occurrence of one of these names,
// even inside a string literal, counts as a profile marker.

/// Http-client profile: request object with `get`/`post`.
pub const CAP_HTTP_CLIENT: &str = "__httpClient";
/// Http-client profile: key-value object with `read`/`write`.
pub const CAP_PERSISTENT_STORE: &str = "__persistentStore";
/// Http-client profile: notification object with `post(...)`.
pub const CAP_NOTIFICATION: &str = "__notification";

/// Task-fetch profile: task object with `fetch`.
pub const CAP_TASK: &str = "__task";
/// Task-fetch profile: preferences object with `valueForKey`/`setValueForKey`.
pub const CAP_PREFS: &str = "__prefs";
/// Task-fetch profile: top-level notify function.
pub const CAP_NOTIFY: &str = "__notify";

/// Capability names owned by the http-client profile.
pub const HTTP_CLIENT_CAPABILITIES: [&str; 3] =
    [CAP_HTTP_CLIENT, CAP_PERSISTENT_STORE, CAP_NOTIFICATION];

/// Capability names owned by the task-fetch profile.
pub const TASK_FETCH_CAPABILITIES: [&str; 3] = [CAP_TASK, CAP_PREFS, CAP_NOTIFY];

static HTTP_CLIENT_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| marker_regex(&HTTP_CLIENT_CAPABILITIES));

static TASK_FETCH_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| marker_regex(&TASK_FETCH_CAPABILITIES));

/// Whole-word match on any of `names`.
fn marker_regex(names: &[&str]) -> Regex {
    let alternatives: Vec<String> = names.iter().map(|name| regex::escape(name)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("valid regex")
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// One of the two supported capability APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    HttpClient,
    TaskFetch,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Self::HttpClient => "http-client",
            Self::TaskFetch => "task-fetch",
        }
    }

    /// Capability names this profile injects into a script context.
    pub fn capabilities(self) -> &'static [&'static str] {
        match self {
            Self::HttpClient => &HTTP_CLIENT_CAPABILITIES,
            Self::TaskFetch => &TASK_FETCH_CAPABILITIES,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "http-client" => Ok(Self::HttpClient),
            "task-fetch" => Ok(Self::TaskFetch),
            other => Err(CoreError::Validation(format!(
                "Unknown profile '{other}'. Must be one of: http-client, task-fetch"
            ))),
        }
    }
}

/// Which profiles are switched on, per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActiveProfiles {
    pub http_client: bool,
    pub task_fetch: bool,
}

impl ActiveProfiles {
    pub const NONE: Self = Self {
        http_client: false,
        task_fetch: false,
    };

    pub fn contains(self, profile: Profile) -> bool {
        match profile {
            Profile::HttpClient => self.http_client,
            Profile::TaskFetch => self.task_fetch,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.http_client && !self.task_fetch
    }
}

/// Scan script source for each profile's marker identifiers.
pub fn scan_markers(source: &str) -> ActiveProfiles {
    ActiveProfiles {
        http_client: HTTP_CLIENT_MARKERS.is_match(source),
        task_fetch: TASK_FETCH_MARKERS.is_match(source),
    }
}

// ---------------------------------------------------------------------------
// Sticky switch
// ---------------------------------------------------------------------------

/// Process-wide sticky profile state.
///
/// Owned by whoever builds contexts and passed in explicitly. A profile,
/// once on, is never switched off.
#[derive(Debug, Default)]
pub struct ProfileSwitch {
    http_client: AtomicBool,
    task_fetch: AtomicBool,
}

impl ProfileSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given profiles already on.
    pub fn with_preset(profiles: &[Profile]) -> Self {
        let switch = Self::new();
        for profile in profiles {
            switch.enable(*profile);
        }
        switch
    }

    fn flag(&self, profile: Profile) -> &AtomicBool {
        match profile {
            Profile::HttpClient => &self.http_client,
            Profile::TaskFetch => &self.task_fetch,
        }
    }

    /// Switch a profile on. Returns `true` if this call flipped it.
    pub fn enable(&self, profile: Profile) -> bool {
        !self.flag(profile).swap(true, Ordering::SeqCst)
    }

    pub fn active(&self) -> ActiveProfiles {
        ActiveProfiles {
            http_client: self.http_client.load(Ordering::SeqCst),
            task_fetch: self.task_fetch.load(Ordering::SeqCst),
        }
    }

    /// Run detection for one script and return the profiles active afterwards.
    ///
    /// Only axes that are still off are scanned for.
    pub fn detect(&self, script_name: &str, source: &str) -> ActiveProfiles {
        let before = self.active();
        if before.http_client && before.task_fetch {
            return before;
        }

        let found = scan_markers(source);
        for profile in [Profile::HttpClient, Profile::TaskFetch] {
            if !before.contains(profile) && found.contains(profile) && self.enable(profile) {
                tracing::debug!(
                    script = script_name,
                    profile = %profile,
                    "Detected capability profile, enabling compatibility mode"
                );
            }
        }

        self.active()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
