//! Notification feed CLI commands.

use std::collections::HashSet;
use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use brewdesk_core::config::AppConfig;
use brewdesk_core::error::AppError;
use brewdesk_core::types::actor::Actor;
use brewdesk_core::types::id::NotificationId;
use brewdesk_entity::notification::{Notification, NotificationCategory};
use brewdesk_feed::{FeedController, FeedPhase, FeedSnapshot};

/// Arguments for feed commands
#[derive(Debug, Args)]
pub struct FeedArgs {
    /// Feed subcommand
    #[command(subcommand)]
    pub command: FeedCommand,
}

/// Feed subcommands
#[derive(Debug, Subcommand)]
pub enum FeedCommand {
    /// List notifications, newest first
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        /// Only one category (e.g. low_stock, new_order)
        #[arg(long)]
        category: Option<String>,
    },
    /// Show the unread count
    Count,
    /// Mark one notification read
    Read {
        /// Notification ID
        id: i64,
    },
    /// Mark every notification read
    ReadAll,
    /// Print notifications as they arrive until interrupted
    Watch,
}

/// Notification display row
#[derive(Debug, Serialize, Tabled)]
struct NotificationRow {
    /// ID
    id: i64,
    /// Category
    category: String,
    /// Priority
    priority: String,
    /// Title
    title: String,
    /// Read
    read: String,
    /// Created
    created: String,
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.get(),
            category: n.category.as_str().to_string(),
            priority: n.priority.as_str().to_string(),
            title: n.title.clone(),
            read: if n.is_read { "✓" } else { "✗" }.to_string(),
            created: n.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Unread count display
#[derive(Debug, Serialize)]
struct CountView {
    actor: Actor,
    phase: FeedPhase,
    unread: u64,
    off_window: u64,
    listed: usize,
}

/// Execute feed commands
pub async fn execute(
    args: &FeedArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let controller = super::create_controller(config)?;
    let actor = config.session.actor();

    let result = run(args, &controller, actor, format).await;

    controller.flush_acks().await;
    controller.teardown();
    result
}

async fn run(
    args: &FeedArgs,
    controller: &Arc<FeedController>,
    actor: Actor,
    format: OutputFormat,
) -> Result<(), AppError> {
    let phase = controller.initialize(actor).await?;
    tracing::debug!(
        actor = %actor,
        phase = ?phase,
        unread = controller.unread_count(),
        "Feed initialized"
    );
    if phase == FeedPhase::Degraded {
        output::print_warning("Feed is partially loaded; results may be incomplete");
    }

    match &args.command {
        FeedCommand::List { unread, category } => {
            let category = category.as_deref().map(parse_category).transpose()?;
            let snapshot = controller.snapshot();
            let rows = filter_rows(&snapshot, *unread, category);
            output::print_list(&rows, format);
        }
        FeedCommand::Count => {
            let snapshot = controller.snapshot();
            let view = CountView {
                actor,
                phase: snapshot.phase,
                unread: snapshot.unread,
                off_window: snapshot.off_window,
                listed: snapshot.entries.len(),
            };
            output::print_item(&view, format);
        }
        FeedCommand::Read { id } => {
            let id = NotificationId::new(*id);
            if controller.mark_read(id) {
                output::print_success(&format!("Notification {} marked read", id));
            } else if controller.snapshot().get(id).is_some() {
                output::print_warning(&format!("Notification {} was already read", id));
            } else {
                output::print_warning(&format!(
                    "Notification {} is not in the feed; acknowledgment sent anyway",
                    id
                ));
            }
        }
        FeedCommand::ReadAll => {
            let flipped = controller.mark_all_read();
            output::print_success(&format!("{} notification(s) marked read", flipped));
        }
        FeedCommand::Watch => watch(controller, format).await?,
    }

    Ok(())
}

/// Print every new entry until Ctrl-C.
async fn watch(controller: &Arc<FeedController>, format: OutputFormat) -> Result<(), AppError> {
    let mut snapshots = controller.watch();
    let mut seen: HashSet<NotificationId> = snapshots
        .borrow_and_update()
        .entries
        .iter()
        .map(|n| n.id)
        .collect();

    println!("Watching notifications (unread: {}), Ctrl-C to stop", controller.unread_count());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let fresh: Vec<Notification> = snapshots
                    .borrow_and_update()
                    .entries
                    .iter()
                    .filter(|n| !seen.contains(&n.id))
                    .cloned()
                    .collect();
                for n in fresh.iter().rev() {
                    seen.insert(n.id);
                    print_arrival(n, format);
                }
                if controller.phase() == FeedPhase::Closed {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn print_arrival(n: &Notification, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(n).unwrap_or_else(|_| "{}".to_string()));
        }
        OutputFormat::Table => {
            println!(
                "{} {:<7} {:<14} {}: {}",
                n.created_at.format("%H:%M:%S"),
                n.priority.as_str(),
                n.category.as_str(),
                n.title,
                n.message
            );
        }
    }
}

fn parse_category(value: &str) -> Result<NotificationCategory, AppError> {
    NotificationCategory::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| {
            let known: Vec<&str> = NotificationCategory::ALL.iter().map(|c| c.as_str()).collect();
            AppError::validation(format!(
                "Unknown category '{}'; expected one of {}",
                value,
                known.join(", ")
            ))
        })
}

fn filter_rows(
    snapshot: &FeedSnapshot,
    unread_only: bool,
    category: Option<NotificationCategory>,
) -> Vec<NotificationRow> {
    snapshot
        .entries
        .iter()
        .filter(|n| !unread_only || n.is_unread())
        .filter(|n| category.is_none_or(|c| n.category == c))
        .map(NotificationRow::from)
        .collect()
}
