//! Background delivery of read acknowledgments.
//!
//! Acknowledgments never block the caller and are never rolled back: a
//! failed transport call is retried up to the configured attempt count and
//! then logged. Other errors are not retried.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use brewdesk_client::transport::NotificationTransport;
use brewdesk_core::config::feed::FeedConfig;
use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;

/// What is being acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckRequest {
    /// One notification was read.
    Read(NotificationId),
    /// Everything was read.
    ReadAll,
}

/// Spawns acknowledgment calls and tracks them until they finish.
#[derive(Debug)]
pub struct AckDispatcher {
    transport: Arc<dyn NotificationTransport>,
    max_attempts: u32,
    backoff: Duration,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl AckDispatcher {
    /// Create a dispatcher using the feed's retry settings.
    pub fn new(transport: Arc<dyn NotificationTransport>, config: &FeedConfig) -> Self {
        Self {
            transport,
            max_attempts: config.ack_max_attempts.max(1),
            backoff: config.ack_backoff(),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Send `request` for `actor` in the background.
    ///
    /// `on_delivered` runs once the server has accepted the request; it is
    /// dropped without running if every attempt fails.
    pub fn dispatch<F>(&self, actor: Actor, request: AckRequest, on_delivered: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let max_attempts = self.max_attempts;
        let backoff = self.backoff;

        let handle = tokio::spawn(async move {
            match deliver(transport.as_ref(), &actor, request, max_attempts, backoff).await {
                Ok(()) => on_delivered(),
                Err(e) => {
                    tracing::warn!(
                        actor = %actor,
                        request = ?request,
                        "Read acknowledgment dropped: {}",
                        e
                    );
                }
            }
        });

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }

    /// Wait for every acknowledgment dispatched so far.
    pub async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *in_flight)
        };
        for handle in pending {
            let _ = handle.await;
        }
    }
}

async fn deliver(
    transport: &dyn NotificationTransport,
    actor: &Actor,
    request: AckRequest,
    max_attempts: u32,
    backoff: Duration,
) -> AppResult<()> {
    let mut attempt = 1;
    loop {
        let result = match request {
            AckRequest::Read(id) => transport.ack_read(actor, id).await,
            AckRequest::ReadAll => transport.ack_read_all(actor).await,
        };

        match result {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= max_attempts || !e.is_transport() => return Err(e),
            Err(e) => {
                let wait = backoff.saturating_mul(2u32.saturating_pow(attempt - 1));
                tracing::debug!(
                    actor = %actor,
                    attempt,
                    retry_in_ms = wait.as_millis() as u64,
                    "Read acknowledgment failed, retrying: {}",
                    e
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
