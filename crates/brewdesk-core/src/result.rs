//! Convenience result type alias for BrewDesk.

use crate::error::AppError;

/// A specialized `Result` type for BrewDesk operations.
pub type AppResult<T> = Result<T, AppError>;
