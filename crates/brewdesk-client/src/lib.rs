//! # brewdesk-client
//!
//! Transport layer consumed by the notification feed controller:
//!
//! - [`NotificationTransport`], the seam the controller is written against
//! - [`HttpTransport`] for the REST history/count/acknowledgment calls
//! - [`WsPushConnector`] for the persistent `new-notification` push channel
//! - [`RestTransport`] combining both for production use
//! - [`MemoryTransport`] for in-process use and tests

pub mod http;
pub mod memory;
pub mod push;
pub mod rest;
pub mod transport;

pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use push::connector::WsPushConnector;
pub use rest::RestTransport;
pub use transport::{NotificationTransport, PushSubscription};
