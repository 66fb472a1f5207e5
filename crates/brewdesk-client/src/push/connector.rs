//! Persistent WebSocket connection delivering push notifications.
//!
//! With [`PushProtocol::SocketIo`] the connector also speaks the client side
//! of the Engine.IO v4 handshake: it joins the default namespace once the
//! session opens, answers every server ping with a pong and treats a missing
//! ping as a dropped connection.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;

use brewdesk_core::config::api::ApiConfig;
use brewdesk_core::config::realtime::{PushProtocol, RealtimeConfig};
use brewdesk_core::error::{AppError, ErrorKind};
use brewdesk_core::result::AppResult;
use brewdesk_core::types::actor::Actor;
use brewdesk_entity::notification::Notification;

use super::frame::{
    ENGINE_PONG, PushFrame, SocketIoPacket, connect_packet, decode_frame, decode_packet,
};
use crate::transport::PushSubscription;

/// Why a single connection ended.
#[derive(Debug, PartialEq, Eq)]
enum ConnectionExit {
    /// The subscription was closed locally.
    Cancelled,
    /// Nobody is listening any more.
    ReceiverGone,
    /// The server closed the socket or the network dropped.
    Dropped,
}

/// Opens push subscriptions over WebSocket and keeps them connected.
#[derive(Debug, Clone)]
pub struct WsPushConnector {
    ws_url: String,
    protocol: PushProtocol,
    token: Option<String>,
    buffer_size: usize,
    reconnect_delay: Duration,
    max_reconnect_delay: Duration,
}

impl WsPushConnector {
    /// Create a connector from the API and realtime configuration.
    pub fn new(api: &ApiConfig, realtime: &RealtimeConfig) -> Self {
        Self {
            ws_url: realtime.ws_url.clone(),
            protocol: realtime.protocol,
            token: api.token.clone(),
            buffer_size: realtime.channel_buffer_size.max(1),
            reconnect_delay: realtime.reconnect_delay(),
            max_reconnect_delay: realtime.max_reconnect_delay(),
        }
    }

    /// The endpoint for `actor`, scoped by query parameters.
    ///
    /// For Socket.IO a bare host gets the `/socket.io/` path, and the
    /// Engine.IO version and transport are added to the query.
    pub fn endpoint(&self, actor: &Actor) -> AppResult<Url> {
        let mut url = Url::parse(&self.ws_url).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid push channel URL '{}': {e}", self.ws_url),
                e,
            )
        })?;
        if self.protocol == PushProtocol::SocketIo {
            if url.path().is_empty() || url.path() == "/" {
                url.set_path("/socket.io/");
            }
            url.query_pairs_mut()
                .append_pair("EIO", "4")
                .append_pair("transport", "websocket");
        }
        url.query_pairs_mut()
            .append_pair("userType", actor.user_type.as_str())
            .append_pair("userId", &actor.user_id.to_string());
        Ok(url)
    }

    /// Open a subscription for `actor`.
    ///
    /// Connecting happens in the background; connection failures are retried
    /// with exponential backoff until the subscription is closed.
    pub fn open(&self, actor: &Actor) -> AppResult<PushSubscription> {
        let url = self.endpoint(actor)?;
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let cancel = CancellationToken::new();

        tokio::spawn(run_connection(self.clone(), url, *actor, tx, cancel.clone()));

        Ok(PushSubscription::new(rx, cancel))
    }

    fn handshake_request(&self, url: &Url) -> AppResult<Request> {
        let mut request = url.as_str().into_client_request().map_err(|e| {
            AppError::with_source(
                ErrorKind::ChannelDropped,
                format!("Invalid push handshake request: {e}"),
                e,
            )
        })?;

        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AppError::configuration(format!("Invalid API token: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        Ok(request)
    }
}

/// Connection loop: connect, pump frames, back off, reconnect.
async fn run_connection(
    connector: WsPushConnector,
    url: Url,
    actor: Actor,
    tx: mpsc::Sender<Notification>,
    cancel: CancellationToken,
) {
    let mut delay = connector.reconnect_delay;

    loop {
        let request = match connector.handshake_request(&url) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(actor = %actor, "Push channel cannot start: {}", e);
                return;
            }
        };

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio_tungstenite::connect_async(request) => result,
        };

        match attempt {
            Ok((stream, _)) => {
                tracing::info!(actor = %actor, "Push channel connected");
                delay = connector.reconnect_delay;

                match pump(stream, &connector, &actor, &tx, &cancel).await {
                    ConnectionExit::Cancelled | ConnectionExit::ReceiverGone => break,
                    ConnectionExit::Dropped => {
                        tracing::warn!(actor = %actor, "Push channel dropped, reconnecting");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    actor = %actor,
                    retry_in_ms = delay.as_millis() as u64,
                    "Push channel connect failed: {}",
                    e
                );
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(connector.max_reconnect_delay);
    }

    tracing::debug!(actor = %actor, "Push channel loop ended");
}

async fn pump<S>(
    mut stream: tokio_tungstenite::WebSocketStream<S>,
    connector: &WsPushConnector,
    actor: &Actor,
    tx: &mpsc::Sender<Notification>,
    cancel: &CancellationToken,
) -> ConnectionExit
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    // Set once an Engine.IO session is open; pushed back by every packet.
    let mut liveness: Option<Duration> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = stream.close(None).await;
                return ConnectionExit::Cancelled;
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                tracing::warn!(actor = %actor, "Push channel missed its ping, dropping");
                return ConnectionExit::Dropped;
            }
            next = stream.next() => next,
        };

        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return ConnectionExit::Dropped,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(actor = %actor, "Push channel read error: {}", e);
                return ConnectionExit::Dropped;
            }
        };

        let decoded = match connector.protocol {
            PushProtocol::Json => decode_frame(text.as_str()),
            PushProtocol::SocketIo => {
                deadline = liveness.map(|d| Instant::now() + d);
                let packet = match decode_packet(text.as_str()) {
                    Ok(packet) => packet,
                    Err(e) => {
                        tracing::debug!(actor = %actor, "Undecodable push packet: {}", e);
                        continue;
                    }
                };
                match packet {
                    SocketIoPacket::Open(open) => {
                        tracing::debug!(
                            actor = %actor,
                            sid = %open.sid,
                            "Engine.IO session opened"
                        );
                        liveness = Some(Duration::from_millis(open.liveness_ms()));
                        deadline = liveness.map(|d| Instant::now() + d);
                        let join = connect_packet(connector.token.as_deref());
                        if stream.send(Message::text(join)).await.is_err() {
                            return ConnectionExit::Dropped;
                        }
                        continue;
                    }
                    SocketIoPacket::Ping => {
                        if stream.send(Message::text(ENGINE_PONG)).await.is_err() {
                            return ConnectionExit::Dropped;
                        }
                        continue;
                    }
                    SocketIoPacket::Connect => {
                        tracing::debug!(actor = %actor, "Socket.IO namespace joined");
                        continue;
                    }
                    SocketIoPacket::Close | SocketIoPacket::Disconnect => {
                        return ConnectionExit::Dropped;
                    }
                    SocketIoPacket::ConnectError(reason) => {
                        tracing::warn!(actor = %actor, "Socket.IO connection refused: {}", reason);
                        return ConnectionExit::Dropped;
                    }
                    SocketIoPacket::Event(frame) => Ok(frame),
                    SocketIoPacket::Ignored => continue,
                }
            }
        };

        match decoded {
            Ok(PushFrame::Notification(notification)) => {
                if tx.send(*notification).await.is_err() {
                    return ConnectionExit::ReceiverGone;
                }
            }
            Ok(PushFrame::Other(event)) => {
                tracing::trace!(actor = %actor, event = %event, "Ignoring push event");
            }
            Err(e) => {
                tracing::debug!(actor = %actor, "Undecodable push frame: {}", e);
            }
        }
    }
}
