//! Notification fan-out, suppression, and retry policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::EventKind;

/// Policy knobs for the notification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Maximum number of push attempts per target, first attempt included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Flat delay between push attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Event kinds that are suppressed while the recipient is viewing the
    /// entity the event refers to.
    #[serde(default = "default_suppress_when_viewing")]
    pub suppress_when_viewing: Vec<EventKind>,
    /// Presence backend: `"memory"` (process-local) or `"cache"` (shared
    /// cache provider, for multi-instance deployments).
    #[serde(default = "default_presence_backend")]
    pub presence_backend: String,
    /// TTL of presence entries in the cache backend, in seconds.
    #[serde(default = "default_presence_ttl")]
    pub presence_ttl_seconds: u64,
    /// Window during which a repeated event ID is ignored, in milliseconds.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_ms: u64,
    /// How long delivery attempt records are kept, in seconds.
    #[serde(default = "default_log_retention")]
    pub delivery_log_retention_seconds: u64,
}

impl NotifyConfig {
    /// Delay between two push attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether events of `kind` are suppressed while their entity is on screen.
    pub fn suppresses_when_viewing(&self, kind: EventKind) -> bool {
        self.suppress_when_viewing.contains(&kind)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            suppress_when_viewing: default_suppress_when_viewing(),
            presence_backend: default_presence_backend(),
            presence_ttl_seconds: default_presence_ttl(),
            dedup_window_ms: default_dedup_window(),
            delivery_log_retention_seconds: default_log_retention(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

fn default_suppress_when_viewing() -> Vec<EventKind> {
    vec![EventKind::Message]
}

fn default_presence_backend() -> String {
    "memory".to_string()
}

fn default_presence_ttl() -> u64 {
    3600
}

fn default_dedup_window() -> u64 {
    60_000
}

fn default_log_retention() -> u64 {
    3600
}
