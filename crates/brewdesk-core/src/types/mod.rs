//! Shared value types: typed identifiers and the feed actor.

pub mod actor;
pub mod id;

pub use actor::{Actor, UserType};
pub use id::{NotificationId, UserId};
