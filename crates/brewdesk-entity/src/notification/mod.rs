//! Notification domain entities.

pub mod category;
pub mod model;
pub mod priority;

pub use category::NotificationCategory;
pub use model::Notification;
pub use priority::NotificationPriority;
