//! Unified application error types for BrewDesk.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A history or unread-count fetch failed (network error or non-2xx).
    FetchFailed,
    /// A read acknowledgment could not be delivered.
    AckFailed,
    /// The push channel dropped or could not be opened.
    ChannelDropped,
    /// Neither the history fetch nor the count fetch succeeded.
    FeedUnavailable,
    /// The feed controller has been torn down.
    FeedClosed,
    /// A newer load replaced this one and its results were discarded.
    Superseded,
    /// Input validation failed.
    Validation,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed => write!(f, "FETCH_FAILED"),
            Self::AckFailed => write!(f, "ACK_FAILED"),
            Self::ChannelDropped => write!(f, "CHANNEL_DROPPED"),
            Self::FeedUnavailable => write!(f, "FEED_UNAVAILABLE"),
            Self::FeedClosed => write!(f, "FEED_CLOSED"),
            Self::Superseded => write!(f, "SUPERSEDED"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout BrewDesk.
///
/// Transport and library errors are mapped into `AppError` using `From`
/// impls or explicit `.map_err()` calls, so the feed controller only ever
/// has to reason about an [`ErrorKind`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a fetch-failed error.
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FetchFailed, message)
    }

    /// Create an ack-failed error.
    pub fn ack_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AckFailed, message)
    }

    /// Create a channel-dropped error.
    pub fn channel_dropped(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChannelDropped, message)
    }

    /// Create a feed-unavailable error.
    pub fn feed_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FeedUnavailable, message)
    }

    /// Create a feed-closed error.
    pub fn feed_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FeedClosed, message)
    }

    /// Create a superseded error.
    pub fn superseded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Superseded, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error should be treated as a transient transport failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::FetchFailed | ErrorKind::AckFailed | ErrorKind::ChannelDropped
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
