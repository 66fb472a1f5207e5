//! CLI command definitions and dispatch.

pub mod config;
pub mod feed;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use brewdesk_client::RestTransport;
use brewdesk_core::config::AppConfig;
use brewdesk_core::error::AppError;
use brewdesk_feed::FeedController;

/// BrewDesk notification feed client
#[derive(Debug, Parser)]
#[command(name = "brewdesk", version, about, long_about = None)]
pub struct Cli {
    /// Path to a configuration file; defaults to `config/` plus overlays
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Notification feed
    Feed(feed::FeedArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(self.config.as_deref())?;
        match &self.command {
            Commands::Feed(args) => feed::execute(args, &config, self.format).await,
            Commands::Config(args) => config::execute(args, &config, self.format),
        }
    }
}

/// Helper: load configuration from an explicit file or the `config/` directory
pub fn load_config(path: Option<&str>) -> Result<AppConfig, AppError> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path, "Loading configuration file");
            AppConfig::load_file(path)
        }
        None => {
            let env =
                std::env::var("BREWDESK_ENV").unwrap_or_else(|_| "development".to_string());
            tracing::debug!(env = %env, "Loading configuration from config/");
            AppConfig::load("config", &env)
        }
    }
}

/// Helper: build a feed controller over the REST/WebSocket transport
pub fn create_controller(config: &AppConfig) -> Result<Arc<FeedController>, AppError> {
    let transport = Arc::new(RestTransport::from_config(config)?);
    Ok(Arc::new(FeedController::new(transport, &config.feed)))
}
