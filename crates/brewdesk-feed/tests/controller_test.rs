//! Integration tests for the feed controller over an in-memory transport.

mod helpers;

use std::time::Duration;

use tokio::sync::watch;

use brewdesk_client::memory::RecordedAck;
use brewdesk_core::config::feed::FeedConfig;
use brewdesk_core::error::ErrorKind;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::{NotificationCategory, NotificationPriority};
use brewdesk_feed::{FeedPhase, PushOutcome, bind_session};

use helpers::{TestFeed, admin, notification, staff};

fn three_entries_two_unread() -> Vec<brewdesk_entity::notification::Notification> {
    vec![
        notification(3, admin(), false),
        notification(2, admin(), true),
        notification(1, admin(), false),
    ]
}

#[tokio::test]
async fn test_initialize_loads_history_and_count() {
    let t = TestFeed::new(three_entries_two_unread());

    let phase = t.controller.initialize(admin()).await.unwrap();

    assert_eq!(phase, FeedPhase::Ready);
    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.entries.len(), 3);
    assert_eq!(snapshot.unread, 2);
    assert_eq!(snapshot.actor, Some(admin()));
    let ids: Vec<i64> = snapshot.entries.iter().map(|n| n.id.get()).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_urgent_push_lands_on_top() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();

    let mut pushed = notification(42, admin(), false);
    pushed.category = NotificationCategory::LowStock;
    pushed.priority = NotificationPriority::Urgent;
    assert_eq!(t.transport.publish(pushed).await, 1);

    let snapshot = t.wait_for(|s| s.entries.len() == 4).await;
    assert_eq!(snapshot.entries[0].id, NotificationId::new(42));
    assert_eq!(snapshot.unread, 3);
    assert_eq!(
        snapshot.highest_unread_priority(),
        Some(NotificationPriority::Urgent)
    );
    assert_eq!(snapshot.by_category(NotificationCategory::LowStock).count(), 1);
}

#[tokio::test]
async fn test_duplicate_push_is_ignored() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();

    let outcome = t.controller.on_push_event(notification(3, admin(), false));

    assert_eq!(outcome, Some(PushOutcome::Duplicate));
    assert_eq!(t.controller.snapshot().entries.len(), 3);
    assert_eq!(t.controller.unread_count(), 2);
}

#[tokio::test]
async fn test_lenient_push_prepends_every_delivery() {
    let config = FeedConfig {
        dedupe_push: false,
        ..FeedConfig::default()
    };
    let t = TestFeed::with_config(Vec::new(), config);
    t.controller.initialize(admin()).await.unwrap();

    t.controller.on_push_event(notification(9, admin(), false));
    t.controller.on_push_event(notification(9, admin(), false));

    assert_eq!(t.controller.snapshot().entries.len(), 2);
    assert_eq!(t.controller.unread_count(), 2);
}

#[tokio::test]
async fn test_count_failure_degrades_but_keeps_history() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.fail_unread_count();

    let phase = t.controller.initialize(admin()).await.unwrap();

    assert_eq!(phase, FeedPhase::Degraded);
    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.entries.len(), 3);
    assert_eq!(snapshot.unread, 2);
}

#[tokio::test]
async fn test_history_failure_keeps_server_count() {
    let t = TestFeed::new(Vec::new());
    t.transport.fail_history();
    t.transport.set_unread_count(5);

    let phase = t.controller.initialize(admin()).await.unwrap();

    assert_eq!(phase, FeedPhase::Degraded);
    let snapshot = t.controller.snapshot();
    assert!(snapshot.entries.is_empty());
    assert_eq!(snapshot.unread, 5);
}

#[tokio::test]
async fn test_both_fetches_failing_reports_unavailable() {
    let t = TestFeed::new(Vec::new());
    t.transport.fail_history();
    t.transport.fail_unread_count();

    let err = t.controller.initialize(admin()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::FeedUnavailable);
    assert_eq!(t.controller.phase(), FeedPhase::Degraded);
    let snapshot = t.controller.snapshot();
    assert!(snapshot.entries.is_empty());
    assert_eq!(snapshot.unread, 0);
}

#[tokio::test]
async fn test_refresh_recovers_after_outage() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.fail_unread_count();
    assert_eq!(
        t.controller.initialize(admin()).await.unwrap(),
        FeedPhase::Degraded
    );

    t.transport.set_unread_count(2);
    let phase = t.controller.refresh().await.unwrap();

    assert_eq!(phase, FeedPhase::Ready);
    assert_eq!(t.controller.unread_count(), 2);
}

#[tokio::test]
async fn test_refresh_requires_actor() {
    let t = TestFeed::new(Vec::new());
    let err = t.controller.refresh().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_subscribe_failure_still_loads() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.fail_subscribe(true);

    let phase = t.controller.initialize(admin()).await.unwrap();

    assert_eq!(phase, FeedPhase::Ready);
    assert_eq!(t.transport.open_subscriptions(), 0);
}

#[tokio::test]
async fn test_push_during_load_is_merged() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.pause_fetches();

    let controller = t.controller.clone();
    let init = tokio::spawn(async move { controller.initialize(admin()).await });
    t.transport.wait_for_fetch_calls(2).await;

    t.transport.publish(notification(50, admin(), false)).await;
    t.wait_for(|s| s.get(NotificationId::new(50)).is_some()).await;
    t.transport.resume_fetches();

    assert_eq!(init.await.unwrap().unwrap(), FeedPhase::Ready);
    let snapshot = t.controller.snapshot();
    let ids: Vec<i64> = snapshot.entries.iter().map(|n| n.id.get()).collect();
    assert_eq!(ids, vec![50, 3, 2, 1]);
    assert_eq!(snapshot.unread, 3);
}

#[tokio::test]
async fn test_teardown_discards_late_fetch() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.pause_fetches();

    let controller = t.controller.clone();
    let init = tokio::spawn(async move { controller.initialize(admin()).await });
    t.transport.wait_for_fetch_calls(2).await;

    t.controller.teardown();
    let closed = t.controller.snapshot();
    t.transport.resume_fetches();

    let err = init.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::FeedClosed);
    assert_eq!(t.controller.phase(), FeedPhase::Closed);
    assert_eq!(t.controller.snapshot(), closed);
    assert!(closed.entries.is_empty());
    assert_eq!(closed.unread, 0);
}

#[tokio::test]
async fn test_teardown_is_idempotent_and_closes_subscription() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();
    assert_eq!(t.transport.open_subscriptions(), 1);

    t.controller.teardown();
    t.controller.teardown();

    assert_eq!(t.controller.phase(), FeedPhase::Closed);
    t.wait_for_no_subscriptions().await;
    assert_eq!(t.transport.publish(notification(60, admin(), false)).await, 0);
    assert_eq!(t.controller.on_push_event(notification(61, admin(), false)), None);
    assert_eq!(t.controller.snapshot().entries.len(), 3);
}

#[tokio::test]
async fn test_initialize_after_teardown_fails() {
    let t = TestFeed::new(Vec::new());
    t.controller.teardown();

    let err = t.controller.initialize(admin()).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::FeedClosed);
    assert_eq!(t.controller.phase(), FeedPhase::Closed);
}

#[tokio::test]
async fn test_mark_read_acknowledges_once() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();

    assert!(t.controller.mark_read(NotificationId::new(3)));
    assert!(!t.controller.mark_read(NotificationId::new(3)));
    t.controller.flush_acks().await;

    assert_eq!(t.controller.unread_count(), 1);
    assert_eq!(t.transport.acks(), vec![RecordedAck::Read(NotificationId::new(3))]);
}

#[tokio::test]
async fn test_mark_read_on_read_entry_is_noop() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();
    let before = t.controller.snapshot();

    assert!(!t.controller.mark_read(NotificationId::new(2)));
    t.controller.flush_acks().await;

    assert_eq!(t.controller.snapshot(), before);
    assert!(t.transport.acks().is_empty());
}

#[tokio::test]
async fn test_mark_all_read_zeroes_count() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();

    assert_eq!(t.controller.mark_all_read(), 2);
    t.controller.flush_acks().await;

    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.unread, 0);
    assert!(snapshot.entries.iter().all(|n| n.is_read));
    assert_eq!(t.transport.acks(), vec![RecordedAck::ReadAll]);
}

#[tokio::test]
async fn test_failed_ack_is_not_rolled_back() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();
    t.transport.fail_next_acks(1);

    assert!(t.controller.mark_read(NotificationId::new(1)));
    t.controller.flush_acks().await;

    let snapshot = t.controller.snapshot();
    assert!(snapshot.get(NotificationId::new(1)).unwrap().is_read);
    assert_eq!(snapshot.unread, 1);
    assert!(t.transport.acks().is_empty());
}

#[tokio::test]
async fn test_actor_change_replaces_feed() {
    let mut history = three_entries_two_unread();
    history.push(notification(10, staff(), false));
    let t = TestFeed::new(history);
    t.transport.set_unread_count(1);
    t.controller.initialize(admin()).await.unwrap();

    t.controller.initialize(staff()).await.unwrap();

    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.actor, Some(staff()));
    let ids: Vec<i64> = snapshot.entries.iter().map(|n| n.id.get()).collect();
    assert_eq!(ids, vec![10]);
    t.wait_for_subscriptions(1).await;
}

#[tokio::test]
async fn test_bind_session_follows_sign_in_and_out() {
    let mut history = three_entries_two_unread();
    history.push(notification(10, staff(), false));
    let t = TestFeed::new(history);
    let (session_tx, session_rx) = watch::channel(None);
    let binding = bind_session(t.controller.clone(), session_rx);

    session_tx.send_replace(Some(admin()));
    let snapshot = t
        .wait_for(|s| s.actor == Some(admin()) && s.phase == FeedPhase::Ready)
        .await;
    assert_eq!(snapshot.entries.len(), 3);

    session_tx.send_replace(Some(staff()));
    let snapshot = t
        .wait_for(|s| s.actor == Some(staff()) && s.phase.is_loaded())
        .await;
    assert_eq!(snapshot.entries.len(), 1);

    session_tx.send_replace(None);
    let snapshot = t
        .wait_for(|s| s.phase == FeedPhase::Uninitialized)
        .await;
    assert!(snapshot.entries.is_empty());
    assert_eq!(snapshot.actor, None);

    drop(session_tx);
    tokio::time::timeout(Duration::from_secs(5), binding)
        .await
        .expect("binding did not end")
        .unwrap();
}

#[tokio::test]
async fn test_count_refresh_keeps_unacknowledged_read() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();
    t.transport.fail_next_acks(1);

    assert!(t.controller.mark_read(NotificationId::new(3)));
    t.controller.flush_acks().await;
    t.transport.fail_history();

    assert_eq!(t.controller.refresh().await.unwrap(), FeedPhase::Degraded);
    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.unread, 1);
    assert_eq!(snapshot.unread_entries().count(), 1);
}

#[tokio::test]
async fn test_count_refresh_after_acknowledged_read() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();

    assert!(t.controller.mark_read(NotificationId::new(3)));
    t.controller.flush_acks().await;
    t.transport.fail_history();

    assert_eq!(t.controller.refresh().await.unwrap(), FeedPhase::Degraded);
    assert_eq!(t.controller.unread_count(), 1);
}

#[tokio::test]
async fn test_count_refresh_keeps_unacknowledged_read_all() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();
    t.transport.fail_next_acks(1);

    t.controller.mark_all_read();
    t.controller.flush_acks().await;
    t.transport.fail_history();

    assert_eq!(t.controller.refresh().await.unwrap(), FeedPhase::Degraded);
    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.unread, 0);
    assert!(snapshot.entries.iter().all(|n| n.is_read));
}

#[tokio::test]
async fn test_history_refresh_after_unacknowledged_read_all() {
    let t = TestFeed::new(three_entries_two_unread());
    t.controller.initialize(admin()).await.unwrap();
    t.transport.fail_next_acks(1);

    t.controller.mark_all_read();
    t.controller.flush_acks().await;

    // The server never saw the bulk read, and 20 arrived without a push.
    let mut history = three_entries_two_unread();
    history.insert(0, notification(20, admin(), false));
    t.transport.set_history(history);
    t.transport.set_unread_count(3);

    assert_eq!(t.controller.refresh().await.unwrap(), FeedPhase::Ready);
    let snapshot = t.controller.snapshot();
    let unread: Vec<i64> = snapshot.unread_entries().map(|n| n.id.get()).collect();
    assert_eq!(unread, vec![20]);
    assert_eq!(snapshot.unread, 1);
}

#[tokio::test]
async fn test_actor_switch_supersedes_pending_load() {
    let mut history = three_entries_two_unread();
    history.push(notification(10, staff(), false));
    let t = TestFeed::new(history);
    t.transport.pause_fetches();

    let controller = t.controller.clone();
    let admin_init = tokio::spawn(async move { controller.initialize(admin()).await });
    t.transport.wait_for_fetch_calls(2).await;

    let controller = t.controller.clone();
    let staff_init = tokio::spawn(async move { controller.initialize(staff()).await });
    t.transport.wait_for_fetch_calls(4).await;
    t.transport.resume_fetches();

    let err = admin_init.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Superseded);
    assert!(staff_init.await.unwrap().unwrap().is_loaded());

    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.actor, Some(staff()));
    let ids: Vec<i64> = snapshot.entries.iter().map(|n| n.id.get()).collect();
    assert_eq!(ids, vec![10]);
}

#[tokio::test]
async fn test_refresh_supersedes_pending_initialize() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.pause_fetches();

    let controller = t.controller.clone();
    let init = tokio::spawn(async move { controller.initialize(admin()).await });
    t.transport.wait_for_fetch_calls(2).await;

    let controller = t.controller.clone();
    let refresh = tokio::spawn(async move { controller.refresh().await });
    t.transport.wait_for_fetch_calls(4).await;
    t.transport.resume_fetches();

    let err = init.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Superseded);
    assert_eq!(refresh.await.unwrap().unwrap(), FeedPhase::Ready);
    assert_eq!(t.controller.snapshot().entries.len(), 3);
    assert_eq!(t.controller.unread_count(), 2);
}

#[tokio::test]
async fn test_sign_out_supersedes_pending_initialize() {
    let t = TestFeed::new(three_entries_two_unread());
    t.transport.pause_fetches();

    let controller = t.controller.clone();
    let init = tokio::spawn(async move { controller.initialize(admin()).await });
    t.transport.wait_for_fetch_calls(2).await;

    t.controller.sign_out();
    t.transport.resume_fetches();

    let err = init.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Superseded);
    let snapshot = t.controller.snapshot();
    assert_eq!(snapshot.phase, FeedPhase::Uninitialized);
    assert!(snapshot.entries.is_empty());
}
