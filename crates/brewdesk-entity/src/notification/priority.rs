//! Notification priority levels.

use serde::{Deserialize, Serialize};

/// Notification priority levels, ordered from least to most pressing.
///
/// Unknown or null wire values decode as [`NotificationPriority::Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum NotificationPriority {
    /// Low priority, informational
    Low,
    /// Medium priority, the backend default
    Medium,
    /// High priority, needs attention this shift
    High,
    /// Urgent priority, needs attention now
    Urgent,
}

impl NotificationPriority {
    /// Parse from string, defaulting to medium
    pub fn from_str_value(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Medium,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Whether the presentation layer should draw attention to it
    pub fn is_pressing(&self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

impl Default for NotificationPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl From<Option<String>> for NotificationPriority {
    fn from(s: Option<String>) -> Self {
        s.as_deref().map(Self::from_str_value).unwrap_or_default()
    }
}

impl From<NotificationPriority> for String {
    fn from(p: NotificationPriority) -> String {
        p.as_str().to_string()
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(NotificationPriority::Urgent > NotificationPriority::High);
        assert!(NotificationPriority::Low < NotificationPriority::Medium);
    }

    #[test]
    fn test_wire_values() {
        let p: NotificationPriority = serde_json::from_str("\"URGENT\"").expect("deserialize");
        assert_eq!(p, NotificationPriority::Urgent);
        let unknown: NotificationPriority =
            serde_json::from_str("\"critical\"").expect("deserialize");
        assert_eq!(unknown, NotificationPriority::Medium);
        assert_eq!(
            serde_json::to_string(&NotificationPriority::High).expect("serialize"),
            "\"high\""
        );
    }

    #[test]
    fn test_null_is_medium() {
        let p: NotificationPriority = serde_json::from_str("null").expect("deserialize");
        assert_eq!(p, NotificationPriority::Medium);
    }
}
