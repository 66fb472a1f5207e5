//! Decoding of push channel text frames.
//!
//! Two framings are understood:
//!
//! - plain WebSocket frames holding a JSON object
//!   `{"event": "...", "data": {...}}`, decoded by [`decode_frame`];
//! - Socket.IO v4 packets carried over the Engine.IO websocket transport,
//!   decoded by [`decode_packet`]. An event arrives as
//!   `42["event", {...}]`, optionally with a namespace and an ack id
//!   between the type digits and the payload.

use serde::Deserialize;
use serde_json::Value;

use brewdesk_core::error::AppError;
use brewdesk_core::result::AppResult;
use brewdesk_entity::notification::Notification;

/// Event name carrying a newly created notification.
pub const NEW_NOTIFICATION_EVENT: &str = "new-notification";

/// Engine.IO pong, sent in answer to a server ping.
pub const ENGINE_PONG: &str = "3";

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum PushFrame {
    /// A `new-notification` event.
    Notification(Box<Notification>),
    /// Any other event, kept by name only.
    Other(String),
}

/// Handshake data sent by an Engine.IO server in its open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOpen {
    /// Session id assigned by the server.
    #[serde(default)]
    pub sid: String,
    /// Interval between server pings, in milliseconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// How long past the interval a ping may be late, in milliseconds.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

impl EngineOpen {
    /// Silence after which the connection counts as dead.
    pub fn liveness_ms(&self) -> u64 {
        self.ping_interval.saturating_add(self.ping_timeout)
    }
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

/// One Engine.IO packet, with Socket.IO packets decoded from its message body.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketIoPacket {
    /// Engine `0`: session opened.
    Open(EngineOpen),
    /// Engine `1`: transport closing.
    Close,
    /// Engine `2`: heartbeat, answered with [`ENGINE_PONG`].
    Ping,
    /// Socket `40`: namespace joined.
    Connect,
    /// Socket `41`: namespace left by the server.
    Disconnect,
    /// Socket `44`: namespace join refused.
    ConnectError(String),
    /// Socket `42`: an event.
    Event(PushFrame),
    /// Anything that needs no handling (pong, noop, upgrade, acks, binary).
    Ignored,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Decode one plain WebSocket frame.
pub fn decode_frame(text: &str) -> AppResult<PushFrame> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(AppError::validation("Push frame is not an event object"));
    }
    let envelope: EventEnvelope = serde_json::from_value(value)?;
    event_frame(envelope.event, envelope.data)
}

/// Decode one Engine.IO text packet.
pub fn decode_packet(text: &str) -> AppResult<SocketIoPacket> {
    let (kind, body) = split_type(text)?;
    match kind {
        '0' => Ok(SocketIoPacket::Open(serde_json::from_str(body)?)),
        '1' => Ok(SocketIoPacket::Close),
        '2' => Ok(SocketIoPacket::Ping),
        '4' => decode_socket_packet(body),
        _ => Ok(SocketIoPacket::Ignored),
    }
}

/// The Socket.IO connect packet for the default namespace.
pub fn connect_packet(token: Option<&str>) -> String {
    match token {
        Some(token) => format!("40{}", serde_json::json!({ "token": token })),
        None => "40".to_string(),
    }
}

fn decode_socket_packet(text: &str) -> AppResult<SocketIoPacket> {
    let (kind, body) = split_type(text)?;
    let body = strip_namespace(body);
    match kind {
        '0' => Ok(SocketIoPacket::Connect),
        '1' => Ok(SocketIoPacket::Disconnect),
        '2' => {
            let payload = body.trim_start_matches(|c: char| c.is_ascii_digit());
            Ok(SocketIoPacket::Event(decode_event_array(payload)?))
        }
        '4' => Ok(SocketIoPacket::ConnectError(connect_error_reason(body))),
        _ => Ok(SocketIoPacket::Ignored),
    }
}

fn split_type(text: &str) -> AppResult<(char, &str)> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| AppError::validation("Empty push packet"))?;
    Ok((kind, chars.as_str()))
}

fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn connect_error_reason(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string(),
        Ok(Value::String(reason)) => reason,
        _ => body.to_string(),
    }
}

fn decode_event_array(text: &str) -> AppResult<PushFrame> {
    let mut items = match serde_json::from_str(text)? {
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(AppError::validation(
                "Socket.IO event payload is not a non-empty array",
            ));
        }
    };

    let data = if items.len() > 1 {
        items.swap_remove(1)
    } else {
        Value::Null
    };
    match items.swap_remove(0) {
        Value::String(event) => event_frame(event, data),
        other => Err(AppError::validation(format!(
            "Push frame event name must be a string, got {other}"
        ))),
    }
}

fn event_frame(event: String, data: Value) -> AppResult<PushFrame> {
    if event == NEW_NOTIFICATION_EVENT {
        let notification: Notification = serde_json::from_value(data)?;
        Ok(PushFrame::Notification(Box::new(notification)))
    } else {
        Ok(PushFrame::Other(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewdesk_core::types::id::NotificationId;

    fn record() -> Value {
        serde_json::json!({
            "id": 42,
            "user_id": 1,
            "user_type": "admin",
            "type": "low_stock",
            "title": "Espresso beans low",
            "message": "1.5 kg left",
            "is_read": false,
            "priority": "urgent",
            "created_at": "2026-10-17T07:12:00Z"
        })
    }

    #[test]
    fn test_decode_object_envelope() {
        let text = serde_json::json!({ "event": "new-notification", "data": record() }).to_string();
        match decode_frame(&text).expect("decode") {
            PushFrame::Notification(n) => assert_eq!(n.id, NotificationId::new(42)),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn test_other_event_kept_by_name() {
        let text = r#"{"event":"order-status","data":{"order_id":5}}"#;
        assert_eq!(
            decode_frame(text).expect("decode"),
            PushFrame::Other("order-status".to_string())
        );
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"["new-notification",{}]"#).is_err());
        assert!(decode_frame(r#"{"event":"new-notification","data":{"id":1}}"#).is_err());
    }

    #[test]
    fn test_plain_frames_do_not_accept_socket_io_packets() {
        let text = format!("42{}", serde_json::json!(["new-notification", record()]));
        assert!(decode_frame(&text).is_err());
        assert!(decode_frame("2").is_err());
    }

    #[test]
    fn test_decode_engine_control_packets() {
        let open = decode_packet(r#"0{"sid":"lv_x","upgrades":[],"pingInterval":300,"pingTimeout":200,"maxPayload":1000000}"#)
            .expect("open");
        match open {
            SocketIoPacket::Open(open) => {
                assert_eq!(open.sid, "lv_x");
                assert_eq!(open.liveness_ms(), 500);
            }
            other => panic!("unexpected packet {other:?}"),
        }
        assert_eq!(decode_packet("1").expect("close"), SocketIoPacket::Close);
        assert_eq!(decode_packet("2").expect("ping"), SocketIoPacket::Ping);
        assert_eq!(decode_packet("3").expect("pong"), SocketIoPacket::Ignored);
        assert_eq!(decode_packet("6").expect("noop"), SocketIoPacket::Ignored);
        assert!(decode_packet("").is_err());
    }

    #[test]
    fn test_decode_namespace_packets() {
        assert_eq!(
            decode_packet(r#"40{"sid":"abc"}"#).expect("connect"),
            SocketIoPacket::Connect
        );
        assert_eq!(decode_packet("41").expect("disconnect"), SocketIoPacket::Disconnect);
        assert_eq!(
            decode_packet(r#"44{"message":"Not authorized"}"#).expect("error"),
            SocketIoPacket::ConnectError("Not authorized".to_string())
        );
    }

    #[test]
    fn test_decode_socket_io_event() {
        let text = format!("42{}", serde_json::json!(["new-notification", record()]));
        match decode_packet(&text).expect("decode") {
            SocketIoPacket::Event(PushFrame::Notification(n)) => {
                assert_eq!(n.id, NotificationId::new(42))
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack_id() {
        let text = format!(
            "42/cafe,17{}",
            serde_json::json!(["new-notification", record()])
        );
        assert!(matches!(
            decode_packet(&text).expect("decode"),
            SocketIoPacket::Event(PushFrame::Notification(_))
        ));

        assert_eq!(
            decode_packet(r#"42["order-status",{"order_id":5}]"#).expect("decode"),
            SocketIoPacket::Event(PushFrame::Other("order-status".to_string()))
        );
        assert!(decode_packet("42[17]").is_err());
        assert!(decode_packet("42[]").is_err());
    }

    #[test]
    fn test_connect_packet_carries_token() {
        assert_eq!(connect_packet(None), "40");
        assert_eq!(connect_packet(Some("s3cret")), r#"40{"token":"s3cret"}"#);
    }
}
