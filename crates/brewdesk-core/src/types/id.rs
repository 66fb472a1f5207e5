//! Newtype wrappers around the backend's numeric identifiers.
//!
//! Using distinct types prevents accidentally passing a `UserId` where a
//! `NotificationId` is expected. Both serialize as bare JSON numbers.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapper around `i64`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user (admin, staff member or customer).
    UserId
);

define_id!(
    /// Server-assigned identifier for a notification.
    NotificationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_id_display() {
        assert_eq!(NotificationId::new(42).to_string(), "42");
    }

    #[test]
    fn test_user_id_from_str() {
        let id: UserId = " 17 ".parse().expect("should parse");
        assert_eq!(id.get(), 17);
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&NotificationId::new(9)).expect("serialize");
        assert_eq!(json, "9");
        let parsed: NotificationId = serde_json::from_str("9").expect("deserialize");
        assert_eq!(parsed, NotificationId::new(9));
    }
}
