//! Production transport: REST calls plus the WebSocket push channel.

use async_trait::async_trait;

use brewdesk_core::config::AppConfig;
use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::Notification;

use crate::http::HttpTransport;
use crate::push::connector::WsPushConnector;
use crate::transport::{NotificationTransport, PushSubscription};

/// [`NotificationTransport`] backed by the café backend.
#[derive(Debug, Clone)]
pub struct RestTransport {
    http: HttpTransport,
    push: WsPushConnector,
}

impl RestTransport {
    /// Compose a transport from its two halves.
    pub fn new(http: HttpTransport, push: WsPushConnector) -> Self {
        Self { http, push }
    }

    /// Build both halves from the application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self::new(
            HttpTransport::new(&config.api)?,
            WsPushConnector::new(&config.api, &config.realtime),
        ))
    }
}

#[async_trait]
impl NotificationTransport for RestTransport {
    async fn fetch_history(&self, actor: &Actor) -> AppResult<Vec<Notification>> {
        self.http.fetch_history(actor).await
    }

    async fn fetch_unread_count(&self, actor: &Actor) -> AppResult<u64> {
        self.http.fetch_unread_count(actor).await
    }

    async fn ack_read(&self, _actor: &Actor, id: NotificationId) -> AppResult<()> {
        self.http.ack_read(id).await
    }

    async fn ack_read_all(&self, actor: &Actor) -> AppResult<()> {
        self.http.ack_read_all(actor).await
    }

    async fn subscribe(&self, actor: &Actor) -> AppResult<PushSubscription> {
        self.push.open(actor)
    }
}
