//! BrewDesk Notifier
//!
//! Keeps the configured actor's notification feed live and logs every
//! change until interrupted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use brewdesk_client::RestTransport;
use brewdesk_core::config::AppConfig;
use brewdesk_core::error::AppError;
use brewdesk_core::types::id::NotificationId;
use brewdesk_feed::{FeedController, FeedPhase, FeedSnapshot, bind_session};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Notifier error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_dir = std::env::var("BREWDESK_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let env = std::env::var("BREWDESK_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_dir, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main notifier run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting BrewDesk notifier v{}", env!("CARGO_PKG_VERSION"));

    let actor = config.session.actor();
    tracing::info!(
        api = %config.api.base_url,
        push = %config.realtime.ws_url,
        actor = %actor,
        "Connecting notification feed"
    );

    let transport = Arc::new(RestTransport::from_config(&config)?);
    let controller = Arc::new(FeedController::new(transport, &config.feed));

    let reporter = tokio::spawn(report_changes(controller.watch()));

    let (session_tx, session_rx) = watch::channel(Some(actor));
    let binding = bind_session(Arc::clone(&controller), session_rx);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, closing feed...");

    controller.teardown();
    drop(session_tx);

    let _ = tokio::time::timeout(Duration::from_secs(5), binding).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reporter).await;

    tracing::info!("BrewDesk notifier shut down");
    Ok(())
}

/// Log phase changes and newly arrived notifications.
async fn report_changes(mut snapshots: watch::Receiver<FeedSnapshot>) {
    let mut phase = FeedPhase::Uninitialized;
    let mut unread = 0;
    let mut seen: HashSet<NotificationId> = HashSet::new();
    let mut seeded = false;

    loop {
        let snapshot = snapshots.borrow_and_update().clone();

        if snapshot.phase != phase {
            tracing::info!(
                from = %phase,
                to = %snapshot.phase,
                entries = snapshot.entries.len(),
                unread = snapshot.unread,
                "Feed phase changed"
            );
            phase = snapshot.phase;
            if phase == FeedPhase::Uninitialized {
                seen.clear();
                seeded = false;
            }
        }

        // The first load seeds the seen set without announcing history.
        for n in snapshot.entries.iter().rev() {
            if seen.insert(n.id) && seeded {
                if n.priority.is_pressing() {
                    tracing::warn!(
                        id = %n.id,
                        category = n.category.as_str(),
                        priority = n.priority.as_str(),
                        "{}: {}",
                        n.title,
                        n.message
                    );
                } else {
                    tracing::info!(
                        id = %n.id,
                        category = n.category.as_str(),
                        priority = n.priority.as_str(),
                        "{}: {}",
                        n.title,
                        n.message
                    );
                }
            }
        }

        if phase.is_loaded() {
            seeded = true;
        }

        if snapshot.unread != unread {
            tracing::info!(unread = snapshot.unread, "Unread count changed");
            unread = snapshot.unread;
        }

        if phase.is_terminal() || snapshots.changed().await.is_err() {
            break;
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
