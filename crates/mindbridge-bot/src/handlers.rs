//! Platform event callbacks.
//!
//! The webhook layer hands each messaging event to `EventHandlers`, which
//! decides whether it is conversation input and, if so, runs it through the
//! orchestrator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mindbridge_core::types::InboundEvent;

use crate::orchestrator::{DeliveryReport, Orchestrator};

/// One entry of a webhook `messaging` array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<IncomingMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback: Option<Postback>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on copies of messages the page itself sent.
    #[serde(default)]
    pub is_echo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReplyTap>,
}

/// Payload of a tapped quick reply chip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReplyTap {
    pub payload: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Conversation input carried by a message event, if any.
///
/// A tapped quick reply forwards its payload (the untruncated option text);
/// echoes and messages without text are not conversation input.
pub fn message_input(event: &MessagingEvent) -> Option<InboundEvent> {
    let message = event.message.as_ref()?;
    if message.is_echo {
        return None;
    }
    let text = message
        .quick_reply
        .as_ref()
        .map(|tap| tap.payload.as_str())
        .filter(|payload| !payload.is_empty())
        .or(message.text.as_deref())?;
    Some(InboundEvent::text(&event.sender.id, text))
}

/// Conversation input carried by a postback, if any. Only the configured
/// get-started payload counts.
pub fn postback_input(event: &MessagingEvent, get_started: Option<&str>) -> Option<InboundEvent> {
    let postback = event.postback.as_ref()?;
    match get_started {
        Some(expected) if postback.payload == expected => {
            Some(InboundEvent::initialize(&event.sender.id))
        }
        _ => None,
    }
}

/// Callbacks the webhook layer invokes for each messaging event.
#[derive(Clone)]
pub struct EventHandlers {
    orchestrator: Arc<Orchestrator>,
}

impl EventHandlers {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Route an event to `on_message` or `on_postback`. Other event kinds
    /// (deliveries, reads) are ignored.
    pub async fn dispatch(&self, event: MessagingEvent) -> Option<DeliveryReport> {
        if event.message.is_some() {
            self.on_message(event).await
        } else if event.postback.is_some() {
            self.on_postback(event).await
        } else {
            debug!(user_id = %event.sender.id, "Ignoring non-conversation event");
            None
        }
    }

    pub async fn on_message(&self, event: MessagingEvent) -> Option<DeliveryReport> {
        match message_input(&event) {
            Some(inbound) => Some(self.orchestrator.handle_event(inbound).await),
            None => {
                debug!(user_id = %event.sender.id, "Ignoring echo or message without text");
                None
            }
        }
    }

    pub async fn on_postback(&self, event: MessagingEvent) -> Option<DeliveryReport> {
        let get_started = self.orchestrator.config().get_started_payload.as_deref();
        match postback_input(&event, get_started) {
            Some(inbound) => Some(self.orchestrator.handle_event(inbound).await),
            None => {
                debug!(
                    user_id = %event.sender.id,
                    payload = event.postback.as_ref().map(|p| p.payload.as_str()),
                    "Ignoring postback"
                );
                None
            }
        }
    }
}
