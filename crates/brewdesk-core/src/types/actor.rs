//! The actor a notification feed is scoped to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::UserId;
use crate::error::AppError;

/// Kind of signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Café administrator.
    Admin,
    /// Staff member (barista, floor, kitchen).
    Staff,
    /// Loyalty-program customer.
    Customer,
}

impl UserType {
    /// Return the user type as used in API paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            "customer" => Ok(Self::Customer),
            other => Err(AppError::validation(format!("Unknown user type '{other}'"))),
        }
    }
}

/// A `(user type, user id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Kind of user.
    pub user_type: UserType,
    /// Numeric user id.
    pub user_id: UserId,
}

impl Actor {
    /// Create an actor.
    pub fn new(user_type: UserType, user_id: UserId) -> Self {
        Self { user_type, user_id }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_type, self.user_id)
    }
}
