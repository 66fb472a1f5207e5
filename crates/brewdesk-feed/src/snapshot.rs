//! Point-in-time views of a feed handed to the presentation layer.

use serde::Serialize;

use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::{Notification, NotificationCategory, NotificationPriority};

use crate::feed::Feed;
use crate::phase::FeedPhase;

/// Immutable copy of a feed's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    /// Controller phase when the snapshot was taken.
    pub phase: FeedPhase,
    /// Actor the feed is bound to.
    pub actor: Option<Actor>,
    /// Entries, newest first.
    pub entries: Vec<Notification>,
    /// Unread count to display on the bell.
    pub unread: u64,
    /// Part of `unread` the server reported beyond the listed entries.
    pub off_window: u64,
}

impl FeedSnapshot {
    /// Snapshot of an unbound controller.
    pub fn empty() -> Self {
        Self {
            phase: FeedPhase::Uninitialized,
            actor: None,
            entries: Vec::new(),
            unread: 0,
            off_window: 0,
        }
    }

    pub(crate) fn capture(phase: FeedPhase, actor: Option<Actor>, feed: &Feed) -> Self {
        Self {
            phase,
            actor,
            entries: feed.to_vec(),
            unread: feed.unread_count(),
            off_window: feed.off_window_unread(),
        }
    }

    /// Look up an entry by id.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Unread entries, newest first.
    pub fn unread_entries(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(|n| n.is_unread())
    }

    /// Entries of one category, newest first.
    pub fn by_category(
        &self,
        category: NotificationCategory,
    ) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(move |n| n.category == category)
    }

    /// Highest priority among unread entries.
    pub fn highest_unread_priority(&self) -> Option<NotificationPriority> {
        self.unread_entries().map(|n| n.priority).max()
    }
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
