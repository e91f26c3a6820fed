//! Shared configuration, error and domain types for Mindbridge.
//!
//! Every other crate in the workspace depends on this one. It holds no I/O
//! beyond reading and writing the TOML configuration file.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BotConfig, MindbridgeConfig, StorageBackend};
pub use error::{MindbridgeError, Result};
pub use types::*;
