//! WebSocket push channel: frame decoding and the reconnecting connector.

pub mod connector;
pub mod frame;

pub use connector::WsPushConnector;
pub use frame::{NEW_NOTIFICATION_EVENT, PushFrame, SocketIoPacket, decode_frame, decode_packet};
