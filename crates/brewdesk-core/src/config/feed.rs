//! Notification feed controller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Feed controller behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Collapse repeated push deliveries of the same notification id.
    #[serde(default = "default_true")]
    pub dedupe_push: bool,
    /// Total attempts per read acknowledgment (1 = no retry).
    #[serde(default = "default_ack_attempts")]
    pub ack_max_attempts: u32,
    /// Base backoff between acknowledgment attempts, doubled per retry.
    #[serde(default = "default_ack_backoff")]
    pub ack_backoff_ms: u64,
}

impl FeedConfig {
    /// Base acknowledgment backoff.
    pub fn ack_backoff(&self) -> Duration {
        Duration::from_millis(self.ack_backoff_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dedupe_push: true,
            ack_max_attempts: default_ack_attempts(),
            ack_backoff_ms: default_ack_backoff(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ack_attempts() -> u32 {
    1
}

fn default_ack_backoff() -> u64 {
    500
}
