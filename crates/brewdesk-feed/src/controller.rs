//! Notification feed controller.
//!
//! Owns the feed for one actor and reconciles its two inputs: the
//! history/unread-count fetch and the push subscription. All state lives
//! behind one mutex that is never held across an `.await`, so completions
//! apply one at a time in the order they finish.
//!
//! Every asynchronous result is tagged when it starts. The session epoch
//! changes on initialize, sign-out and teardown; the load sequence changes
//! on every fetch. Results whose tags are no longer current are dropped and
//! the call that started them fails with `Superseded`.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use brewdesk_client::transport::{NotificationTransport, PushSubscription};
use brewdesk_core::config::feed::FeedConfig;
use brewdesk_core::error::AppError;
use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::Notification;

use crate::ack::{AckDispatcher, AckRequest};
use crate::feed::{Feed, MarkOutcome, PushOutcome};
use crate::phase::FeedPhase;
use crate::snapshot::FeedSnapshot;

/// Running push pump for the current session.
#[derive(Debug)]
struct PushPump {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PushPump {
    fn stop(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[derive(Debug)]
struct FeedState {
    phase: FeedPhase,
    actor: Option<Actor>,
    epoch: u64,
    load_seq: u64,
    feed: Feed,
    push: Option<PushPump>,
}

impl FeedState {
    fn stop_push(&mut self) {
        if let Some(pump) = self.push.take() {
            pump.stop();
        }
    }
}

/// State shared between the controller and its push pump.
#[derive(Debug)]
struct Shared {
    state: Mutex<FeedState>,
    snapshots: watch::Sender<FeedSnapshot>,
    dedupe_push: bool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &FeedState) {
        self.snapshots.send_replace(FeedSnapshot::capture(
            state.phase,
            state.actor,
            &state.feed,
        ));
    }

    /// Apply a pushed notification if `epoch` is still current.
    ///
    /// `None` means the push was not applied because the session moved on.
    fn apply_push(&self, epoch: Option<u64>, notification: Notification) -> Option<PushOutcome> {
        let mut state = self.lock();
        if state.phase.is_terminal() || epoch.is_some_and(|e| e != state.epoch) {
            tracing::debug!(id = %notification.id, "Discarding push for a stale feed");
            return None;
        }

        let id = notification.id;
        let outcome = state.feed.push(notification, self.dedupe_push);
        match outcome {
            PushOutcome::Duplicate => {
                tracing::debug!(id = %id, "Duplicate push delivery ignored");
            }
            PushOutcome::Inserted | PushOutcome::MarkedRead => {
                tracing::debug!(id = %id, unread = state.feed.unread_count(), "Push applied");
                self.publish(&state);
            }
        }
        Some(outcome)
    }

    /// Run `confirm` against the feed if it still belongs to `actor`.
    fn confirm(&self, actor: Actor, confirm: impl FnOnce(&mut Feed, u64)) {
        let mut state = self.lock();
        if state.phase.is_terminal() || state.actor != Some(actor) {
            return;
        }
        let seq = state.load_seq;
        confirm(&mut state.feed, seq);
    }
}

/// Controller for one actor's notification feed.
#[derive(Debug)]
pub struct FeedController {
    shared: Arc<Shared>,
    transport: Arc<dyn NotificationTransport>,
    acks: AckDispatcher,
}

impl FeedController {
    /// Create a controller in the `Uninitialized` phase.
    pub fn new(transport: Arc<dyn NotificationTransport>, config: &FeedConfig) -> Self {
        let state = FeedState {
            phase: FeedPhase::Uninitialized,
            actor: None,
            epoch: 0,
            load_seq: 0,
            feed: Feed::new(),
            push: None,
        };
        let (snapshots, _) = watch::channel(FeedSnapshot::empty());

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                snapshots,
                dedupe_push: config.dedupe_push,
            }),
            acks: AckDispatcher::new(Arc::clone(&transport), config),
            transport,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> FeedPhase {
        self.shared.lock().phase
    }

    /// Actor the feed is bound to.
    pub fn actor(&self) -> Option<Actor> {
        self.shared.lock().actor
    }

    /// Current unread count.
    pub fn unread_count(&self) -> u64 {
        self.shared.lock().feed.unread_count()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.shared.lock();
        FeedSnapshot::capture(state.phase, state.actor, &state.feed)
    }

    /// Receiver that sees a new snapshot after every state change.
    pub fn watch(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Bind the feed to `actor`, open its push subscription and load it.
    ///
    /// Binding a different actor clears the feed first. Partial loads
    /// succeed in the `Degraded` phase; if both fetches fail the feed keeps
    /// its previous contents and `FeedUnavailable` is returned. A newer
    /// initialize, refresh or sign-out that overtakes this call makes it
    /// fail with `Superseded`.
    pub async fn initialize(&self, actor: Actor) -> AppResult<FeedPhase> {
        let epoch = {
            let mut state = self.shared.lock();
            if state.phase.is_terminal() {
                return Err(AppError::feed_closed("Feed controller was torn down"));
            }
            if state.actor != Some(actor) {
                state.feed.clear();
            }
            state.stop_push();
            state.actor = Some(actor);
            state.epoch += 1;
            state.phase = FeedPhase::Loading;
            self.shared.publish(&state);
            state.epoch
        };

        tracing::info!(actor = %actor, "Initializing notification feed");

        match self.transport.subscribe(&actor).await {
            Ok(subscription) => {
                let mut state = self.shared.lock();
                if state.phase.is_terminal() {
                    return Err(AppError::feed_closed(
                        "Feed controller was torn down during initialization",
                    ));
                }
                if state.epoch != epoch {
                    return Err(AppError::superseded(format!(
                        "Initialization for {actor} was replaced before it subscribed"
                    )));
                }
                state.push = Some(self.spawn_pump(subscription, epoch));
            }
            Err(e) => {
                tracing::warn!(actor = %actor, "Push channel unavailable: {}", e);
            }
        }

        self.load(epoch, actor).await
    }

    /// Re-fetch history and unread count without touching the subscription.
    pub async fn refresh(&self) -> AppResult<FeedPhase> {
        let (epoch, actor) = {
            let mut state = self.shared.lock();
            if state.phase.is_terminal() {
                return Err(AppError::feed_closed("Feed controller was torn down"));
            }
            let Some(actor) = state.actor else {
                return Err(AppError::validation("Feed is not bound to an actor"));
            };
            state.phase = FeedPhase::Loading;
            self.shared.publish(&state);
            (state.epoch, actor)
        };

        self.load(epoch, actor).await
    }

    async fn load(&self, epoch: u64, actor: Actor) -> AppResult<FeedPhase> {
        let seq = {
            let mut state = self.shared.lock();
            state.load_seq += 1;
            state.load_seq
        };

        let (history, unread) = tokio::join!(
            self.transport.fetch_history(&actor),
            self.transport.fetch_unread_count(&actor),
        );

        let mut state = self.shared.lock();
        if state.phase.is_terminal() {
            tracing::debug!(actor = %actor, "Discarding fetch results after teardown");
            return Err(AppError::feed_closed(
                "Feed controller was torn down while loading",
            ));
        }
        if state.epoch != epoch || state.load_seq != seq {
            tracing::debug!(actor = %actor, "Discarding superseded fetch results");
            return Err(AppError::superseded(format!(
                "A newer load replaced this one for {actor}"
            )));
        }

        state.feed.retire_confirmed(seq);

        let phase = match (history, unread) {
            (Ok(history), Ok(count)) => {
                state.feed.apply_history(history, Some(count));
                FeedPhase::Ready
            }
            (Ok(history), Err(e)) => {
                tracing::warn!(actor = %actor, "Unread count fetch failed: {}", e);
                state.feed.apply_history(history, None);
                FeedPhase::Degraded
            }
            (Err(e), Ok(count)) => {
                tracing::warn!(actor = %actor, "History fetch failed: {}", e);
                state.feed.apply_unread_count(count);
                FeedPhase::Degraded
            }
            (Err(history_err), Err(count_err)) => {
                tracing::warn!(
                    actor = %actor,
                    "Notification feed unavailable: {}; {}",
                    history_err,
                    count_err
                );
                state.phase = FeedPhase::Degraded;
                self.shared.publish(&state);
                return Err(AppError::feed_unavailable(format!(
                    "History and unread count both failed for {actor}: {history_err}; {count_err}"
                )));
            }
        };

        state.phase = phase;
        self.shared.publish(&state);
        tracing::info!(
            actor = %actor,
            phase = %phase,
            entries = state.feed.len(),
            unread = state.feed.unread_count(),
            pending_reads = state.feed.pending_reads(),
            "Notification feed loaded"
        );
        Ok(phase)
    }

    fn spawn_pump(&self, mut subscription: PushSubscription, epoch: u64) -> PushPump {
        let cancel = subscription.cancel_token();
        let shared = Arc::clone(&self.shared);

        let task = tokio::spawn(async move {
            while let Some(notification) = subscription.next().await {
                if shared.apply_push(Some(epoch), notification).is_none() {
                    break;
                }
            }
            tracing::debug!(epoch, "Push pump ended");
        });

        PushPump { cancel, task }
    }

    /// Deliver a pushed notification.
    ///
    /// Returns `None` once the controller is closed.
    pub fn on_push_event(&self, notification: Notification) -> Option<PushOutcome> {
        self.shared.apply_push(None, notification)
    }

    /// Mark one notification read.
    ///
    /// The local change is immediate; the acknowledgment is sent in the
    /// background and not rolled back if it fails. Returns whether the
    /// unread count changed.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        let (actor, outcome) = {
            let mut state = self.shared.lock();
            if state.phase.is_terminal() {
                return false;
            }
            let Some(actor) = state.actor else {
                return false;
            };
            let outcome = state.feed.mark_read(id);
            if matches!(outcome, MarkOutcome::Marked | MarkOutcome::OffWindow) {
                self.shared.publish(&state);
            }
            (actor, outcome)
        };

        if outcome != MarkOutcome::AlreadyRead {
            let shared = Arc::clone(&self.shared);
            self.acks.dispatch(actor, AckRequest::Read(id), move || {
                shared.confirm(actor, |feed, seq| feed.confirm_read(id, seq));
            });
        }
        matches!(outcome, MarkOutcome::Marked | MarkOutcome::OffWindow)
    }

    /// Mark every notification read and send one bulk acknowledgment.
    ///
    /// Returns the number of listed entries that changed.
    pub fn mark_all_read(&self) -> usize {
        let (actor, flipped) = {
            let mut state = self.shared.lock();
            if state.phase.is_terminal() {
                return 0;
            }
            let Some(actor) = state.actor else {
                return 0;
            };
            let flipped = state.feed.mark_all_read();
            self.shared.publish(&state);
            (actor, flipped)
        };

        let shared = Arc::clone(&self.shared);
        self.acks.dispatch(actor, AckRequest::ReadAll, move || {
            shared.confirm(actor, |feed, seq| feed.confirm_read_all(seq));
        });
        flipped
    }

    /// Wait for background acknowledgments to finish.
    pub async fn flush_acks(&self) {
        self.acks.flush().await;
    }

    /// Unbind the actor: drop the subscription and the feed contents.
    pub fn sign_out(&self) {
        let mut state = self.shared.lock();
        if state.phase.is_terminal() {
            return;
        }
        state.stop_push();
        state.feed.clear();
        state.actor = None;
        state.epoch += 1;
        state.phase = FeedPhase::Uninitialized;
        self.shared.publish(&state);
        tracing::info!("Notification feed signed out");
    }

    /// Close the push subscription and stop applying results. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.shared.lock();
        if state.phase.is_terminal() {
            return;
        }
        state.stop_push();
        state.epoch += 1;
        state.phase = FeedPhase::Closed;
        self.shared.publish(&state);
        tracing::info!(actor = ?state.actor, "Notification feed closed");
    }
}

impl Drop for FeedController {
    fn drop(&mut self) {
        self.teardown();
    }
}
