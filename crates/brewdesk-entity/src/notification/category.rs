//! Notification category enumeration.

use serde::{Deserialize, Serialize};

/// Category of a notification, used by the presentation layer for icons
/// and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// An inventory item fell below its reorder threshold.
    LowStock,
    /// A new order was placed.
    NewOrder,
    /// A customer requested an event booking.
    EventRequest,
    /// A payment changed state.
    PaymentUpdate,
    /// An existing order changed state.
    OrderUpdate,
    /// Anything else, including categories this client does not know.
    #[serde(other)]
    Generic,
}

impl NotificationCategory {
    /// All categories in display order.
    pub const ALL: [Self; 6] = [
        Self::LowStock,
        Self::NewOrder,
        Self::EventRequest,
        Self::PaymentUpdate,
        Self::OrderUpdate,
        Self::Generic,
    ];

    /// Return the category as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "low_stock",
            Self::NewOrder => "new_order",
            Self::EventRequest => "event_request",
            Self::PaymentUpdate => "payment_update",
            Self::OrderUpdate => "order_update",
            Self::Generic => "generic",
        }
    }

    /// Parse a category name, falling back to [`Self::Generic`].
    pub fn from_str_value(s: &str) -> Self {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .unwrap_or(Self::Generic)
    }
}

impl Default for NotificationCategory {
    fn default() -> Self {
        Self::Generic
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_category_is_generic() {
        let parsed: NotificationCategory =
            serde_json::from_str("\"loyalty_tier_change\"").expect("deserialize");
        assert_eq!(parsed, NotificationCategory::Generic);
    }

    #[test]
    fn test_from_str_value() {
        assert_eq!(
            NotificationCategory::from_str_value("LOW_STOCK"),
            NotificationCategory::LowStock
        );
        assert_eq!(
            NotificationCategory::from_str_value("nope"),
            NotificationCategory::Generic
        );
    }
}
