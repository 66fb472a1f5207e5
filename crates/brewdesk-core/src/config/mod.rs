//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod api;
pub mod feed;
pub mod logging;
pub mod realtime;
pub mod session;

use serde::{Deserialize, Serialize};

use self::api::ApiConfig;
use self::feed::FeedConfig;
use self::logging::LoggingConfig;
use self::realtime::RealtimeConfig;
use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (default.toml + environment overlay + `BREWDESK__*` variables).
/// Every section has defaults, so an empty source is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend REST API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Signed-in actor for headless clients.
    #[serde(default)]
    pub session: SessionConfig,
    /// Feed controller behavior.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Push channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `{dir}/default`, the `{dir}/{env}` overlay and environment
    /// variables prefixed with `BREWDESK__`.
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BREWDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from a single file, ignoring overlays.
    pub fn load_file(path: &str) -> Result<Self, AppError> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the clients cannot work with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::configuration("api.base_url must not be empty"));
        }
        if self.feed.ack_max_attempts == 0 {
            return Err(AppError::configuration(
                "feed.ack_max_attempts must be at least 1",
            ));
        }
        if self.realtime.channel_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.channel_buffer_size must be at least 1",
            ));
        }
        Ok(())
    }
}
