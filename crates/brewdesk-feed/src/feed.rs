//! The ordered, id-indexed notification collection behind a feed.
//!
//! Entries are kept newest-first. The unread count is maintained
//! incrementally on every mutation and always equals the number of unread
//! entries plus the off-window remainder reported by the server.
//!
//! Local reads are remembered until a server response that started after
//! the read was acknowledged comes back. Until then, server counts and
//! unread copies of those notifications are treated as stale.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};

use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::Notification;

/// Result of delivering a pushed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Prepended as a new entry.
    Inserted,
    /// Same id already present; nothing changed.
    Duplicate,
    /// Same id already present and the newer copy moved it to read.
    MarkedRead,
}

/// Result of marking a single notification read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// An unread entry was flipped to read.
    Marked,
    /// The entry was already read; the count did not change.
    AlreadyRead,
    /// Not listed locally; one off-window unread was consumed.
    OffWindow,
    /// Not listed locally and nothing off-window to consume.
    Unknown,
}

/// A local read the server may not reflect yet.
#[derive(Debug, Clone, Copy, Default)]
struct PendingRead {
    /// Load sequence that was current when the server accepted the read.
    confirmed_at: Option<u64>,
}

impl PendingRead {
    fn confirm(&mut self, load_seq: u64) {
        self.confirmed_at.get_or_insert(load_seq);
    }

    /// Whether a load numbered `load_seq` started after the server accepted
    /// the read.
    fn reflected_by(&self, load_seq: u64) -> bool {
        self.confirmed_at.is_some_and(|seq| load_seq > seq)
    }
}

/// A local mark-all-read the server may not reflect yet.
#[derive(Debug, Clone, Copy)]
struct PendingReadAll {
    /// Newest listed entry at the time; `None` if nothing was listed.
    horizon: Option<DateTime<Utc>>,
    read: PendingRead,
}

/// Ordered notification collection with an incrementally maintained
/// unread count.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    entries: VecDeque<Notification>,
    ids: HashSet<NotificationId>,
    /// Ids delivered by push since history was last applied.
    pushed: HashSet<NotificationId>,
    /// Unread entries in `entries`.
    listed_unread: u64,
    /// Unread notifications the server counts but the history did not list.
    off_window_unread: u64,
    /// Single reads not yet reflected by the server.
    pending_reads: HashMap<NotificationId, PendingRead>,
    /// Mark-all-read not yet reflected by the server.
    pending_read_all: Option<PendingReadAll>,
}

impl Feed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Total unread count shown to the user.
    pub fn unread_count(&self) -> u64 {
        self.listed_unread + self.off_window_unread
    }

    /// Unread notifications the server reported beyond the listed history.
    pub fn off_window_unread(&self) -> u64 {
        self.off_window_unread
    }

    /// Copy the entries out, newest first.
    pub fn to_vec(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    /// Drop every entry and reset the count.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Record that the server accepted the read of `id`.
    pub fn confirm_read(&mut self, id: NotificationId, load_seq: u64) {
        if let Some(pending) = self.pending_reads.get_mut(&id) {
            pending.confirm(load_seq);
        }
    }

    /// Record that the server accepted the mark-all-read.
    pub fn confirm_read_all(&mut self, load_seq: u64) {
        if let Some(pending) = self.pending_read_all.as_mut() {
            pending.read.confirm(load_seq);
        }
    }

    /// Forget local reads the server has reflected by the time a load
    /// numbered `load_seq` started.
    pub fn retire_confirmed(&mut self, load_seq: u64) {
        self.pending_reads.retain(|_, pending| !pending.reflected_by(load_seq));
        if self
            .pending_read_all
            .is_some_and(|pending| pending.read.reflected_by(load_seq))
        {
            self.pending_read_all = None;
        }
    }

    /// Local reads the server has not reflected yet.
    pub fn pending_reads(&self) -> usize {
        self.pending_reads.len() + usize::from(self.pending_read_all.is_some())
    }

    /// Whether a fetched unread copy is covered by a pending mark-all-read.
    fn read_by_read_all(&self, entry: &Notification) -> bool {
        match self.pending_read_all {
            Some(PendingReadAll {
                horizon: Some(horizon),
                ..
            }) => entry.created_at <= horizon,
            Some(PendingReadAll { horizon: None, .. }) => !self.pushed.contains(&entry.id),
            None => false,
        }
    }

    /// Replace the listed history with a fresh server fetch.
    ///
    /// Entries pushed since the last history load and missing from
    /// `history` stay on top in their current order. An entry the user
    /// already read stays read even if the fetched copy is unread. With
    /// `server_unread`, any unread the history does not list is kept as the
    /// off-window remainder, less the local reads the server has not
    /// reflected yet.
    pub fn apply_history(&mut self, history: Vec<Notification>, server_unread: Option<u64>) {
        let previous: Vec<Notification> = self.entries.drain(..).collect();
        let mut locally_read: HashSet<NotificationId> = previous
            .iter()
            .filter(|n| n.is_read)
            .map(|n| n.id)
            .collect();
        locally_read.extend(self.pending_reads.keys().copied());
        let fetched: HashSet<NotificationId> = history.iter().map(|n| n.id).collect();

        let mut merged: VecDeque<Notification> = VecDeque::with_capacity(history.len());
        let mut ids: HashSet<NotificationId> = HashSet::with_capacity(history.len());

        for entry in previous {
            let carried = self.pushed.contains(&entry.id) && !fetched.contains(&entry.id);
            if carried && ids.insert(entry.id) {
                merged.push_back(entry);
            }
        }

        // Fetched copies the server still counts as unread but the user read.
        let mut overridden = 0u64;
        for mut entry in history {
            if !ids.insert(entry.id) {
                continue;
            }
            if entry.is_read {
                // The server already has it as read.
                self.pending_reads.remove(&entry.id);
            } else if locally_read.contains(&entry.id) || self.read_by_read_all(&entry) {
                entry.is_read = true;
                overridden += 1;
            }
            merged.push_back(entry);
        }
        let unlisted_pending = self
            .pending_reads
            .keys()
            .filter(|id| !fetched.contains(id))
            .count() as u64;

        self.listed_unread = merged.iter().filter(|n| n.is_unread()).count() as u64;
        self.off_window_unread = match server_unread {
            Some(_) if self.pending_read_all.is_some() => 0,
            Some(count) => {
                count.saturating_sub(self.listed_unread + overridden + unlisted_pending)
            }
            None => 0,
        };
        self.entries = merged;
        self.ids = ids;
        self.pushed.clear();
    }

    /// Apply a server unread count without a history listing.
    ///
    /// Listed entries are left as they are. The difference, less the local
    /// reads the server has not reflected yet, becomes the off-window
    /// remainder.
    pub fn apply_unread_count(&mut self, server_unread: u64) {
        self.off_window_unread = if self.pending_read_all.is_some() {
            0
        } else {
            server_unread.saturating_sub(self.listed_unread + self.pending_reads.len() as u64)
        };
    }

    /// Deliver a pushed notification.
    ///
    /// With `dedupe`, a repeated id keeps its first position and may only
    /// move the entry from unread to read. Without it every delivery is
    /// prepended.
    pub fn push(&mut self, notification: Notification, dedupe: bool) -> PushOutcome {
        if dedupe && self.ids.contains(&notification.id) {
            if notification.is_read {
                if let Some(existing) = self
                    .entries
                    .iter_mut()
                    .find(|n| n.id == notification.id && n.is_unread())
                {
                    existing.is_read = true;
                    self.listed_unread = self.listed_unread.saturating_sub(1);
                    return PushOutcome::MarkedRead;
                }
            }
            return PushOutcome::Duplicate;
        }

        if notification.is_unread() {
            self.listed_unread += 1;
        }
        self.ids.insert(notification.id);
        self.pushed.insert(notification.id);
        self.entries.push_front(notification);
        PushOutcome::Inserted
    }

    /// Mark one notification read.
    ///
    /// Every listed copy of `id` is flipped; the count never goes below zero.
    pub fn mark_read(&mut self, id: NotificationId) -> MarkOutcome {
        if !self.ids.contains(&id) {
            self.pending_reads.entry(id).or_default();
            if self.off_window_unread > 0 {
                self.off_window_unread -= 1;
                return MarkOutcome::OffWindow;
            }
            return MarkOutcome::Unknown;
        }

        let mut flipped = 0u64;
        for entry in self.entries.iter_mut().filter(|n| n.id == id) {
            if entry.is_unread() {
                entry.is_read = true;
                flipped += 1;
            }
        }

        if flipped == 0 {
            MarkOutcome::AlreadyRead
        } else {
            self.listed_unread = self.listed_unread.saturating_sub(flipped);
            self.pending_reads.entry(id).or_default();
            MarkOutcome::Marked
        }
    }

    /// Mark everything read, including the off-window remainder.
    ///
    /// Returns the number of listed entries that changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut flipped = 0;
        for entry in self.entries.iter_mut().filter(|n| n.is_unread()) {
            entry.is_read = true;
            flipped += 1;
        }
        self.listed_unread = 0;
        self.off_window_unread = 0;
        self.pending_reads.clear();
        self.pending_read_all = Some(PendingReadAll {
            horizon: self.entries.iter().map(|n| n.created_at).max(),
            read: PendingRead::default(),
        });
        flipped
    }

    #[cfg(test)]
    fn recount(&self) -> u64 {
        self.entries.iter().filter(|n| n.is_unread()).count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewdesk_core::types::actor::UserType;
    use brewdesk_core::types::id::UserId;
    use brewdesk_entity::notification::{NotificationCategory, NotificationPriority};
    use chrono::Utc;

    fn note(id: i64, is_read: bool) -> Notification {
        Notification {
            id: NotificationId::new(id),
            user_id: UserId::new(1),
            user_type: UserType::Admin,
            category: NotificationCategory::LowStock,
            title: format!("Item {id} low"),
            message: String::new(),
            data: None,
            is_read,
            email_sent: false,
            priority: NotificationPriority::High,
            created_at: Utc::now(),
        }
    }

    fn ids(feed: &Feed) -> Vec<i64> {
        feed.iter().map(|n| n.id.get()).collect()
    }

    #[test]
    fn test_push_prepends_and_counts() {
        let mut feed = Feed::new();
        assert_eq!(feed.push(note(1, false), true), PushOutcome::Inserted);
        assert_eq!(feed.push(note(2, true), true), PushOutcome::Inserted);
        assert_eq!(feed.push(note(3, false), true), PushOutcome::Inserted);

        assert_eq!(ids(&feed), vec![3, 2, 1]);
        assert_eq!(feed.unread_count(), 2);
        assert_eq!(feed.unread_count(), feed.recount());
    }

    #[test]
    fn test_unread_matches_entries_over_mixed_push_sequence() {
        let mut feed = Feed::new();
        let sequence = [
            (1, false),
            (2, false),
            (1, false),
            (3, true),
            (2, true),
            (4, false),
            (4, false),
            (1, true),
        ];
        for (id, read) in sequence {
            feed.push(note(id, read), true);
            assert_eq!(feed.unread_count(), feed.recount());
        }
        assert_eq!(ids(&feed), vec![4, 3, 2, 1]);
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_duplicate_push_keeps_first_position() {
        let mut feed = Feed::new();
        feed.push(note(1, false), true);
        feed.push(note(2, false), true);
        assert_eq!(feed.push(note(1, false), true), PushOutcome::Duplicate);
        assert_eq!(ids(&feed), vec![2, 1]);
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn test_stale_unread_copy_never_reverts_read() {
        let mut feed = Feed::new();
        feed.push(note(5, false), true);
        assert_eq!(feed.mark_read(NotificationId::new(5)), MarkOutcome::Marked);
        assert_eq!(feed.push(note(5, false), true), PushOutcome::Duplicate);
        assert!(feed.get(NotificationId::new(5)).unwrap().is_read);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn test_lenient_push_duplicates_entries() {
        let mut feed = Feed::new();
        feed.push(note(8, false), false);
        feed.push(note(8, false), false);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.unread_count(), 2);

        assert_eq!(feed.mark_read(NotificationId::new(8)), MarkOutcome::Marked);
        assert_eq!(feed.unread_count(), 0);
        assert_eq!(feed.unread_count(), feed.recount());
    }

    #[test]
    fn test_mark_read_twice_is_count_noop() {
        let mut feed = Feed::new();
        feed.push(note(1, false), true);
        feed.push(note(2, false), true);
        feed.mark_read(NotificationId::new(1));
        assert_eq!(
            feed.mark_read(NotificationId::new(1)),
            MarkOutcome::AlreadyRead
        );
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_mark_read_unknown_id() {
        let mut feed = Feed::new();
        assert_eq!(feed.mark_read(NotificationId::new(99)), MarkOutcome::Unknown);
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn test_mark_all_read_zeroes_everything() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(3, false), note(2, true), note(1, false)], Some(7));
        assert_eq!(feed.unread_count(), 7);

        assert_eq!(feed.mark_all_read(), 2);
        assert_eq!(feed.unread_count(), 0);
        assert!(feed.iter().all(|n| n.is_read));
    }

    #[test]
    fn test_history_in_server_order() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(3, false), note(1, false), note(2, true)], Some(2));
        assert_eq!(ids(&feed), vec![3, 1, 2]);
        assert_eq!(feed.unread_count(), 2);
        assert_eq!(feed.off_window_unread(), 0);
    }

    #[test]
    fn test_push_before_history_is_merged_by_id() {
        let mut feed = Feed::new();
        // 11 arrives by push while the fetch is in flight; 10 is in both.
        feed.push(note(10, false), true);
        feed.push(note(11, false), true);
        feed.apply_history(vec![note(10, false), note(9, true)], Some(1));

        assert_eq!(ids(&feed), vec![11, 10, 9]);
        assert_eq!(feed.unread_count(), 2);
        assert_eq!(feed.unread_count(), feed.recount());
    }

    #[test]
    fn test_history_keeps_local_read() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(2, false), note(1, false)], None);
        feed.mark_read(NotificationId::new(2));

        // Refetch races the acknowledgment and still says unread.
        feed.apply_history(vec![note(2, false), note(1, false)], Some(2));
        assert!(feed.get(NotificationId::new(2)).unwrap().is_read);
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_off_window_unread() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(20, false)], Some(4));
        assert_eq!(feed.unread_count(), 4);
        assert_eq!(feed.off_window_unread(), 3);

        assert_eq!(feed.mark_read(NotificationId::new(5)), MarkOutcome::OffWindow);
        assert_eq!(feed.unread_count(), 3);
    }

    #[test]
    fn test_count_without_list_ignores_unconfirmed_reads() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(2, false), note(1, false)], Some(2));
        feed.mark_read(NotificationId::new(2));

        feed.apply_unread_count(2);
        assert_eq!(feed.unread_count(), 1);
        assert_eq!(feed.pending_reads(), 1);
    }

    #[test]
    fn test_confirmed_read_retires_on_later_load_only() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(2, false), note(1, false)], Some(2));
        feed.mark_read(NotificationId::new(2));
        feed.confirm_read(NotificationId::new(2), 1);

        // A load issued before the acknowledgment landed proves nothing.
        feed.retire_confirmed(1);
        assert_eq!(feed.pending_reads(), 1);

        feed.retire_confirmed(2);
        assert_eq!(feed.pending_reads(), 0);
        feed.apply_unread_count(1);
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_history_confirming_read_clears_pending() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(2, false), note(1, false)], Some(2));
        feed.mark_read(NotificationId::new(2));

        feed.apply_history(vec![note(2, true), note(1, false)], Some(1));
        assert_eq!(feed.pending_reads(), 0);
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_unconfirmed_read_all_holds_count_to_listed() {
        let mut feed = Feed::new();
        feed.apply_history(vec![note(2, false), note(1, false)], Some(9));
        feed.mark_all_read();

        feed.apply_unread_count(9);
        assert_eq!(feed.unread_count(), 0);

        feed.push(note(3, false), true);
        feed.apply_unread_count(10);
        assert_eq!(feed.unread_count(), 1);
        assert_eq!(feed.unread_count(), feed.recount());
    }

    #[test]
    fn test_unconfirmed_read_all_overrides_older_fetched_copies() {
        let mut feed = Feed::new();
        let older = note(1, false);
        let mut newer = note(2, false);
        newer.created_at = older.created_at + chrono::Duration::minutes(5);

        feed.apply_history(vec![older.clone()], Some(1));
        feed.mark_all_read();
        feed.apply_history(vec![newer, older], Some(2));

        assert!(feed.get(NotificationId::new(1)).unwrap().is_read);
        assert!(feed.get(NotificationId::new(2)).unwrap().is_unread());
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn test_count_without_list() {
        let mut feed = Feed::new();
        feed.apply_unread_count(6);
        assert!(feed.is_empty());
        assert_eq!(feed.unread_count(), 6);
    }
}
