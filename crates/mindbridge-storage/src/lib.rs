//! Mindbridge storage crate - session stores.
//!
//! Defines the `SessionStore` trait consumed by the conversation
//! orchestrator and two interchangeable implementations: a durable
//! SQLite-backed table and an in-process map with sliding expiry.

pub mod db;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

pub use db::Database;
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use store::{Retention, SessionStore};
