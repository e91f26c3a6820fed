//! Error types for the conversation core.

use mindbridge_core::error::MindbridgeError;

/// Errors raised by the dialogue engine, chat transport and session store
/// while handling one event.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("engine request failed: {0}")]
    Engine(String),
    #[error("engine returned {status}: {body}")]
    EngineStatus { status: u16, body: String },
    #[error("malformed engine reply: {0}")]
    MalformedReply(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("profile lookup failed: {0}")]
    Profile(String),
}

impl From<MindbridgeError> for BotError {
    fn from(err: MindbridgeError) -> Self {
        BotError::Storage(err.to_string())
    }
}
