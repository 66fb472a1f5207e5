//! Shared helpers for feed controller integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use brewdesk_client::MemoryTransport;
use brewdesk_core::config::feed::FeedConfig;
use brewdesk_core::types::actor::{Actor, UserType};
use brewdesk_core::types::id::{NotificationId, UserId};
use brewdesk_entity::notification::{Notification, NotificationCategory, NotificationPriority};
use brewdesk_feed::{FeedController, FeedSnapshot};

/// The admin most tests sign in as.
pub fn admin() -> Actor {
    Actor::new(UserType::Admin, UserId::new(1))
}

/// A staff member.
pub fn staff() -> Actor {
    Actor::new(UserType::Staff, UserId::new(4))
}

/// Build a notification for `actor`.
pub fn notification(id: i64, actor: Actor, is_read: bool) -> Notification {
    Notification {
        id: NotificationId::new(id),
        user_id: actor.user_id,
        user_type: actor.user_type,
        category: NotificationCategory::NewOrder,
        title: format!("Order #{id}"),
        message: "Table 4".to_string(),
        data: Some(serde_json::json!({ "order_id": id })),
        is_read,
        email_sent: false,
        priority: NotificationPriority::Medium,
        created_at: Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()
            + chrono::Duration::minutes(id),
    }
}

/// Test context: a controller wired to a memory transport.
pub struct TestFeed {
    /// Scripted transport.
    pub transport: Arc<MemoryTransport>,
    /// Controller under test.
    pub controller: Arc<FeedController>,
}

impl TestFeed {
    /// Controller with default settings over `history`.
    pub fn new(history: Vec<Notification>) -> Self {
        Self::with_config(history, FeedConfig::default())
    }

    /// Controller with custom settings over `history`.
    pub fn with_config(history: Vec<Notification>, config: FeedConfig) -> Self {
        let transport = Arc::new(MemoryTransport::new(history));
        let controller = Arc::new(FeedController::new(transport.clone(), &config));
        Self {
            transport,
            controller,
        }
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> FeedSnapshot
    where
        F: FnMut(&FeedSnapshot) -> bool,
    {
        let mut rx = self.controller.watch();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("controller dropped");
        snapshot.clone()
    }

    /// Wait until exactly `n` push subscriptions are open.
    pub async fn wait_for_subscriptions(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.transport.open_subscriptions() != n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("unexpected number of open subscriptions");
    }

    /// Wait until every push subscription has been released.
    pub async fn wait_for_no_subscriptions(&self) {
        self.wait_for_subscriptions(0).await;
    }
}
