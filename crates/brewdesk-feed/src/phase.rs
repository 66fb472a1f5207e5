//! Feed lifecycle phases.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a feed controller.
///
/// ```text
/// Uninitialized -> Loading -> Ready
///                  Loading -> Degraded      (one or both fetches failed)
/// Ready/Degraded -> Loading -> Ready        (refresh / re-initialize)
/// any -> Closed                              (teardown, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    /// No actor bound yet, or signed out.
    Uninitialized,
    /// Fetches are in flight.
    Loading,
    /// History and unread count both loaded.
    Ready,
    /// Loaded partially, or a load failed.
    Degraded,
    /// Torn down; no further state changes.
    Closed,
}

impl FeedPhase {
    /// Return the phase as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
            Self::Closed => "closed",
        }
    }

    /// Whether the phase can never be left.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether feed contents are worth showing.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

impl std::fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
