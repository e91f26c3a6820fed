//! Conversation core for Mindbridge.
//!
//! Resolves a platform user to a dialogue-engine session, forwards the
//! user's text, translates the engine reply into chat messages and delivers
//! them through the chat transport.

pub mod engine;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod orchestrator;
pub mod transport;
pub mod translator;

pub use engine::{DialogueEngine, HttpDialogueEngine, NewSession};
pub use error::BotError;
pub use handlers::{EventHandlers, MessagingEvent};
pub use orchestrator::{DeliveryReport, Orchestrator};
pub use transport::{ChatTransport, MessengerClient};
pub use translator::{sanitize, split_segments, translate};
