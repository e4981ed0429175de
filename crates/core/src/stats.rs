//! Run-count aggregation with periodic digests.
//!
//! [`RunStats`] counts invocations per script. Every `threshold` total
//! invocations it produces one [`Digest`] and starts a fresh window. The
//! countdown and the per-script counts live behind one lock, so a single
//! accounting step is atomic even when runs overlap.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::Mutex;

/// Default number of runs per digest.
pub const DEFAULT_DIGEST_THRESHOLD: u32 = 50;

/// Timestamp format used in digest bodies.
const DIGEST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One aggregated summary, emitted every `threshold` runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    pub title: String,
    pub body: String,
    pub threshold: u32,
    pub started_at: DateTime<Utc>,
    /// Per-script counts in first-seen order; always sums to `threshold`.
    pub counts: Vec<(String, u32)>,
}

/// A read-only view of the current window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub threshold: u32,
    pub started_at: DateTime<Utc>,
    pub remaining: u32,
    pub counts: IndexMap<String, u32>,
}

#[derive(Debug)]
struct Window {
    started_at: DateTime<Utc>,
    remaining: u32,
    counts: IndexMap<String, u32>,
}

impl Window {
    fn fresh(threshold: u32) -> Self {
        Self {
            started_at: Utc::now(),
            remaining: threshold,
            counts: IndexMap::new(),
        }
    }
}

/// Process-wide run counters.
#[derive(Debug)]
pub struct RunStats {
    threshold: u32,
    window: Mutex<Window>,
}

impl RunStats {
    /// Create counters that digest every `threshold` runs (at least 1).
    pub fn new(threshold: u32) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            window: Mutex::new(Window::fresh(threshold)),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Count one run of `filename`.
    ///
    /// Returns the digest when this run completes a window; the window is
    /// reset before the lock is released.
    pub async fn record(&self, filename: &str) -> Option<Digest> {
        let mut window = self.window.lock().await;

        *window.counts.entry(filename.to_string()).or_insert(0) += 1;
        window.remaining = window.remaining.saturating_sub(1);

        tracing::debug!(
            script = filename,
            remaining = window.remaining,
            counts = ?window.counts,
            "Script run statistics"
        );

        if window.remaining > 0 {
            return None;
        }

        let finished = std::mem::replace(&mut *window, Window::fresh(self.threshold));
        Some(self.digest(finished))
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let window = self.window.lock().await;
        StatsSnapshot {
            threshold: self.threshold,
            started_at: window.started_at,
            remaining: window.remaining,
            counts: window.counts.clone(),
        }
    }

    fn digest(&self, window: Window) -> Digest {
        let fragments: Vec<String> = window
            .counts
            .iter()
            .map(|(name, count)| format!("{name}: {count} times"))
            .collect();

        Digest {
            title: format!("Ran scripts {} times", self.threshold),
            body: format!(
                "Since {}: {}",
                window.started_at.format(DIGEST_TIME_FORMAT),
                fragments.join(", ")
            ),
            threshold: self.threshold,
            started_at: window.started_at,
            counts: window.counts.into_iter().collect(),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(DEFAULT_DIGEST_THRESHOLD)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
