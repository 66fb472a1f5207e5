//! # brewdesk-entity
//!
//! Domain entity models for the BrewDesk dashboard client. Every struct in
//! this crate mirrors a record served by the café backend. All entities
//! derive `Debug`, `Clone`, `Serialize` and `Deserialize`.

pub mod notification;
