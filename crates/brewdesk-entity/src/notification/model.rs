//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brewdesk_core::types::actor::{Actor, UserType};
use brewdesk_core::types::id::{NotificationId, UserId};

use super::category::NotificationCategory;
use super::priority::NotificationPriority;

/// A notification addressed to one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Server-assigned identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// The recipient's user type.
    pub user_type: UserType,
    /// Notification category. The backend calls this field `type`.
    #[serde(rename = "type", alias = "category", default)]
    pub category: NotificationCategory,
    /// Short title.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub message: String,
    /// Category-specific structured data, opaque to the feed.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Whether the recipient has read this notification.
    #[serde(alias = "read", default)]
    pub is_read: bool,
    /// Whether an email copy was sent.
    #[serde(default)]
    pub email_sent: bool,
    /// Priority level.
    #[serde(default)]
    pub priority: NotificationPriority,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification has not been read.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// The actor this notification is addressed to.
    pub fn recipient(&self) -> Actor {
        Actor::new(self.user_type, self.user_id)
    }

    /// Whether this notification is addressed to `actor`.
    pub fn is_for(&self, actor: &Actor) -> bool {
        self.recipient() == *actor
    }
}
