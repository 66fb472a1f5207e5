//! Transport trait for the notification feed and the push subscription
//! handle it hands out.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::Notification;

/// Everything the feed controller needs from the backend.
///
/// Implementations own reconnect policy for the push channel; the
/// controller only ever sees delivered notifications.
#[async_trait]
pub trait NotificationTransport: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the actor's notification history, newest first.
    async fn fetch_history(&self, actor: &Actor) -> AppResult<Vec<Notification>>;

    /// Fetch the actor's server-side unread count.
    async fn fetch_unread_count(&self, actor: &Actor) -> AppResult<u64>;

    /// Acknowledge that a single notification was read.
    async fn ack_read(&self, actor: &Actor, id: NotificationId) -> AppResult<()>;

    /// Acknowledge that every notification of the actor was read.
    async fn ack_read_all(&self, actor: &Actor) -> AppResult<()>;

    /// Open a push subscription delivering newly created notifications.
    async fn subscribe(&self, actor: &Actor) -> AppResult<PushSubscription>;
}

/// An open push subscription.
///
/// Dropping the subscription or calling [`PushSubscription::close`] stops
/// the producer behind it.
#[derive(Debug)]
pub struct PushSubscription {
    receiver: mpsc::Receiver<Notification>,
    cancel: CancellationToken,
}

impl PushSubscription {
    /// Wrap a receiver and the token that stops its producer.
    pub fn new(receiver: mpsc::Receiver<Notification>, cancel: CancellationToken) -> Self {
        Self { receiver, cancel }
    }

    /// Wait for the next delivered notification.
    ///
    /// Returns `None` once the subscription is closed or the producer is gone.
    pub async fn next(&mut self) -> Option<Notification> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            msg = self.receiver.recv() => msg,
        }
    }

    /// Close the subscription.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A token that closes this subscription when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
