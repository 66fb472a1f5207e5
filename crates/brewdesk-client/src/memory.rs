//! In-process transport with scripted responses.
//!
//! Serves a history and unread count, applies and records acknowledgments
//! the way the backend does, and fans published notifications out to
//! matching subscribers. Fetches can be held open to simulate slow
//! responses.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use brewdesk_core::error::AppError;
use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::Notification;

use crate::transport::{NotificationTransport, PushSubscription};

/// A read acknowledgment received by the memory transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedAck {
    /// `ack_read(id)`
    Read(NotificationId),
    /// `ack_read_all()`
    ReadAll,
}

#[derive(Debug)]
struct MemoryState {
    /// `None` makes history fetches fail.
    history: Option<Vec<Notification>>,
    /// `None` makes count fetches fail.
    unread_count: Option<u64>,
    /// Remaining acknowledgment calls that fail before acks succeed again.
    failing_acks: u32,
    fail_subscribe: bool,
    acks: Vec<RecordedAck>,
    subscribers: Vec<(Actor, mpsc::Sender<Notification>)>,
}

/// Transport living entirely in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
    buffer_size: usize,
    /// `false` holds every fetch until reopened.
    gate: watch::Sender<bool>,
    /// Number of fetch calls started so far.
    fetch_calls: watch::Sender<usize>,
}

impl MemoryTransport {
    /// Create a transport with the given history; the unread count defaults
    /// to the number of unread entries in it.
    pub fn new(history: Vec<Notification>) -> Self {
        let unread = history.iter().filter(|n| n.is_unread()).count() as u64;
        Self {
            state: Mutex::new(MemoryState {
                history: Some(history),
                unread_count: Some(unread),
                failing_acks: 0,
                fail_subscribe: false,
                acks: Vec::new(),
                subscribers: Vec::new(),
            }),
            buffer_size: 64,
            gate: watch::Sender::new(true),
            fetch_calls: watch::Sender::new(0),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the served history.
    pub fn set_history(&self, history: Vec<Notification>) {
        self.lock().history = Some(history);
    }

    /// Make history fetches fail.
    pub fn fail_history(&self) {
        self.lock().history = None;
    }

    /// Replace the served unread count.
    pub fn set_unread_count(&self, count: u64) {
        self.lock().unread_count = Some(count);
    }

    /// Make unread-count fetches fail.
    pub fn fail_unread_count(&self) {
        self.lock().unread_count = None;
    }

    /// Make the next `n` acknowledgment calls fail.
    pub fn fail_next_acks(&self, n: u32) {
        self.lock().failing_acks = n;
    }

    /// Make subscription attempts fail.
    pub fn fail_subscribe(&self, fail: bool) {
        self.lock().fail_subscribe = fail;
    }

    /// Hold every fetch until [`resume_fetches`](Self::resume_fetches).
    pub fn pause_fetches(&self) {
        self.gate.send_replace(false);
    }

    /// Release held fetches.
    pub fn resume_fetches(&self) {
        self.gate.send_replace(true);
    }

    /// Wait until at least `n` fetch calls have started.
    pub async fn wait_for_fetch_calls(&self, n: usize) {
        let mut rx = self.fetch_calls.subscribe();
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }

    /// Acknowledgments received so far.
    pub fn acks(&self) -> Vec<RecordedAck> {
        self.lock().acks.clone()
    }

    /// Number of subscriptions still open.
    pub fn open_subscriptions(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|(_, tx)| !tx.is_closed());
        state.subscribers.len()
    }

    /// Deliver `notification` to every open subscription of its recipient.
    ///
    /// Returns the number of subscriptions it was delivered to.
    pub async fn publish(&self, notification: Notification) -> usize {
        let targets: Vec<mpsc::Sender<Notification>> = {
            let mut state = self.lock();
            state.subscribers.retain(|(_, tx)| !tx.is_closed());
            state
                .subscribers
                .iter()
                .filter(|(actor, _)| notification.is_for(actor))
                .map(|(_, tx)| tx.clone())
                .collect()
        };

        let mut delivered = 0;
        for tx in targets {
            if tx.send(notification.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    async fn enter_fetch(&self) {
        self.fetch_calls.send_modify(|calls| *calls += 1);
        let mut rx = self.gate.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }

    /// Apply an acknowledgment for `actor` unless it is scripted to fail.
    fn record_ack(&self, actor: &Actor, ack: RecordedAck) -> AppResult<()> {
        let mut state = self.lock();
        if state.failing_acks > 0 {
            state.failing_acks -= 1;
            return Err(AppError::ack_failed(format!("{ack:?} rejected")));
        }

        let MemoryState {
            history,
            unread_count,
            acks,
            ..
        } = &mut *state;
        let entries = history.iter_mut().flatten().filter(|n| n.is_for(actor));
        match ack {
            RecordedAck::Read(id) => {
                let mut listed = false;
                let mut flipped = false;
                for n in entries.filter(|n| n.id == id) {
                    listed = true;
                    flipped |= !n.is_read;
                    n.is_read = true;
                }
                // Unlisted ids stand for notifications beyond the history.
                if flipped || !listed {
                    if let Some(count) = unread_count.as_mut() {
                        *count = count.saturating_sub(1);
                    }
                }
            }
            RecordedAck::ReadAll => {
                entries.for_each(|n| n.is_read = true);
                if let Some(count) = unread_count.as_mut() {
                    *count = 0;
                }
            }
        }
        acks.push(ack);
        Ok(())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    async fn fetch_history(&self, actor: &Actor) -> AppResult<Vec<Notification>> {
        self.enter_fetch().await;
        match &self.lock().history {
            Some(history) => Ok(history
                .iter()
                .filter(|n| n.is_for(actor))
                .cloned()
                .collect()),
            None => Err(AppError::fetch_failed("history unavailable")),
        }
    }

    async fn fetch_unread_count(&self, _actor: &Actor) -> AppResult<u64> {
        self.enter_fetch().await;
        self.lock()
            .unread_count
            .ok_or_else(|| AppError::fetch_failed("unread count unavailable"))
    }

    async fn ack_read(&self, actor: &Actor, id: NotificationId) -> AppResult<()> {
        self.record_ack(actor, RecordedAck::Read(id))
    }

    async fn ack_read_all(&self, actor: &Actor) -> AppResult<()> {
        self.record_ack(actor, RecordedAck::ReadAll)
    }

    async fn subscribe(&self, actor: &Actor) -> AppResult<PushSubscription> {
        let mut state = self.lock();
        if state.fail_subscribe {
            return Err(AppError::channel_dropped("push channel refused"));
        }
        let (tx, rx) = mpsc::channel(self.buffer_size);
        state.subscribers.push((*actor, tx));
        Ok(PushSubscription::new(rx, CancellationToken::new()))
    }
}
