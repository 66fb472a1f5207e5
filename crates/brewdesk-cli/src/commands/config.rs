//! Configuration CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use brewdesk_core::config::AppConfig;
use brewdesk_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            output::print_item(&redacted(config), format);
        }
    }
    Ok(())
}

/// Copy of `config` safe to print.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.api.token.is_some() {
        shown.api.token = Some("****".to_string());
    }
    shown
}
