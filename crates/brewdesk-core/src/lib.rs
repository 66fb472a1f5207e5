//! # brewdesk-core
//!
//! Core crate for the BrewDesk café dashboard client. Contains the
//! configuration schemas, typed identifiers, actor types and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other BrewDesk crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
