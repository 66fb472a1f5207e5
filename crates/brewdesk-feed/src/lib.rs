//! # brewdesk-feed
//!
//! Client-side notification feed for the BrewDesk dashboard. Provides:
//!
//! - [`Feed`], the ordered, deduplicated notification collection
//! - [`FeedController`], which merges history fetches with the push stream
//!   and sends read acknowledgments
//! - [`FeedSnapshot`]s published to the presentation layer on every change
//! - [`bind_session`], which re-initializes the feed when the signed-in
//!   actor changes

pub mod ack;
pub mod controller;
pub mod feed;
pub mod phase;
pub mod session;
pub mod snapshot;

pub use ack::{AckDispatcher, AckRequest};
pub use controller::FeedController;
pub use feed::{Feed, MarkOutcome, PushOutcome};
pub use phase::FeedPhase;
pub use session::bind_session;
pub use snapshot::FeedSnapshot;
