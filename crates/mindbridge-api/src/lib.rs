//! Mindbridge API crate - axum HTTP server for the Messenger webhook.
//!
//! Serves the webhook verification handshake, receives event deliveries and
//! hands each messaging event to the bot, plus liveness and health checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod webhook;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
