//! REST client for the notification endpoints.

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use brewdesk_core::config::api::ApiConfig;
use brewdesk_core::error::{AppError, ErrorKind};
use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::Notification;

/// Body of `GET /notifications/{userType}`.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    notifications: Vec<Notification>,
}

/// Body of `GET /notifications/{userType}/unread-count`.
#[derive(Debug, Deserialize)]
struct UnreadCountResponse {
    count: i64,
}

/// HTTP client for the notification REST surface.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    /// Build a client from the API configuration.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Failed to build HTTP client: {e}"),
                    e,
                )
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// `GET /notifications/{userType}`
    pub async fn fetch_history(&self, actor: &Actor) -> AppResult<Vec<Notification>> {
        let path = format!("notifications/{}", actor.user_type);
        let body: HistoryResponse = self.get_json(&path).await?;
        tracing::debug!(
            actor = %actor,
            count = body.notifications.len(),
            "Fetched notification history"
        );
        Ok(body.notifications)
    }

    /// `GET /notifications/{userType}/unread-count`
    pub async fn fetch_unread_count(&self, actor: &Actor) -> AppResult<u64> {
        let path = format!("notifications/{}/unread-count", actor.user_type);
        let body: UnreadCountResponse = self.get_json(&path).await?;
        Ok(body.count.max(0) as u64)
    }

    /// `PATCH /notifications/{id}/read`
    pub async fn ack_read(&self, id: NotificationId) -> AppResult<()> {
        self.patch(&format!("notifications/{id}/read")).await
    }

    /// `PATCH /notifications/{userType}/mark-all-read`
    pub async fn ack_read_all(&self, actor: &Actor) -> AppResult<()> {
        self.patch(&format!("notifications/{}/mark-all-read", actor.user_type))
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::FetchFailed,
                    format!("GET /{path} failed: {e}"),
                    e,
                )
            })?;

        response.json::<T>().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::FetchFailed,
                format!("GET /{path} returned an unreadable body: {e}"),
                e,
            )
        })
    }

    async fn patch(&self, path: &str) -> AppResult<()> {
        self.request(Method::PATCH, path)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::AckFailed,
                    format!("PATCH /{path} failed: {e}"),
                    e,
                )
            })?;
        Ok(())
    }
}
