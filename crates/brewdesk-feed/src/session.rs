//! Keeps a controller bound to whoever is signed in.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use brewdesk_core::error::ErrorKind;
use brewdesk_core::types::actor::Actor;

use crate::controller::FeedController;

/// Follow the signed-in actor published on `session`.
///
/// Each new actor re-initializes the controller; `None` signs it out. The
/// task ends when the session sender is dropped or the controller is
/// torn down.
pub fn bind_session(
    controller: Arc<FeedController>,
    mut session: watch::Receiver<Option<Actor>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current: Option<Actor> = None;

        loop {
            let next = *session.borrow_and_update();
            if next != current {
                current = next;
                match next {
                    Some(actor) => {
                        match controller.initialize(actor).await {
                            Ok(_) => {}
                            Err(e) if e.kind == ErrorKind::FeedClosed => break,
                            Err(e) if e.kind == ErrorKind::Superseded => {
                                tracing::debug!(
                                    actor = %actor,
                                    "Feed initialization replaced: {}",
                                    e
                                );
                            }
                            // Degraded feeds stay usable; retry is manual.
                            Err(e) => {
                                tracing::warn!(actor = %actor, "Feed initialization failed: {}", e);
                            }
                        }
                    }
                    None => controller.sign_out(),
                }
            }

            if session.changed().await.is_err() {
                break;
            }
        }

        tracing::debug!("Session binding ended");
    })
}
