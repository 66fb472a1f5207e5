//! Signed-in actor configuration for headless clients.

use serde::{Deserialize, Serialize};

use crate::types::actor::{Actor, UserType};
use crate::types::id::UserId;

/// The actor a headless client (daemon, CLI) signs in as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Actor type: `"admin"`, `"staff"` or `"customer"`.
    #[serde(default = "default_user_type")]
    pub user_type: UserType,
    /// Numeric user id of the actor.
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

impl SessionConfig {
    /// The configured actor.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_type, UserId::new(self.user_id))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_type: default_user_type(),
            user_id: default_user_id(),
        }
    }
}

fn default_user_type() -> UserType {
    UserType::Admin
}

fn default_user_id() -> i64 {
    1
}
