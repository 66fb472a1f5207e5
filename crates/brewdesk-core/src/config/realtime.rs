//! Push channel (WebSocket) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Framing of the push channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushProtocol {
    /// Plain WebSocket carrying `{"event": ..., "data": ...}` objects.
    #[default]
    Json,
    /// Socket.IO v4 over the Engine.IO websocket transport.
    SocketIo,
}

/// Push channel connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:5000/ws`.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Framing spoken on the socket.
    #[serde(default)]
    pub protocol: PushProtocol,
    /// Buffer size of the in-process channel between socket and controller.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Delay before the first reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Upper bound for the exponential reconnect delay, in milliseconds.
    #[serde(default = "default_max_reconnect_delay")]
    pub max_reconnect_delay_ms: u64,
}

impl RealtimeConfig {
    /// Initial reconnect delay.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Maximum reconnect delay.
    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms.max(self.reconnect_delay_ms))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            protocol: PushProtocol::default(),
            channel_buffer_size: default_channel_buffer(),
            reconnect_delay_ms: default_reconnect_delay(),
            max_reconnect_delay_ms: default_max_reconnect_delay(),
        }
    }
}

fn default_ws_url() -> String {
    "ws://localhost:5000/ws".to_string()
}

fn default_channel_buffer() -> usize {
    256
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_max_reconnect_delay() -> u64 {
    30_000
}
