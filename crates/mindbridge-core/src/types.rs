use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content sent to the dialogue engine to start its opening script.
pub const INIT_TOKEN: &str = "INIT";

// =============================================================================
// Sessions
// =============================================================================

/// Binding between a platform user and a dialogue-engine session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Platform-assigned user id. Unique key.
    pub user_id: String,
    /// Opaque id issued by the dialogue engine.
    pub session_id: String,
    pub updated_at: DateTime<Utc>,
    /// Set only by expiring stores.
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            updated_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Whether the record has passed its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// What the user sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventContent {
    /// Free text typed by the user.
    Text(String),
    /// Session-initialization trigger (the "get started" postback).
    Initialize,
}

/// One inbound chat event, handled once and never persisted.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    /// Correlation id for logs.
    pub id: Uuid,
    pub user_id: String,
    pub content: EventContent,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_content(user_id, EventContent::Text(text.into()))
    }

    pub fn initialize(user_id: impl Into<String>) -> Self {
        Self::with_content(user_id, EventContent::Initialize)
    }

    fn with_content(user_id: impl Into<String>, content: EventContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            content,
            received_at: Utc::now(),
        }
    }
}

// =============================================================================
// Engine reply and outbound messages
// =============================================================================

/// Raw reply from the dialogue engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineReply {
    /// Markup text; segments are separated by `<br>`.
    pub response: String,
    #[serde(default)]
    pub quick_responses: Vec<String>,
}

/// A single chat message ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_responses: Option<Vec<String>>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quick_responses: None,
        }
    }

    /// Whether this message should be sent with quick-reply chips.
    pub fn has_quick_responses(&self) -> bool {
        self.quick_responses
            .as_ref()
            .is_some_and(|replies| !replies.is_empty())
    }
}

/// Display profile of a platform user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Indicator actions the chat platform renders in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
}

impl SenderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderAction::MarkSeen => "mark_seen",
            SenderAction::TypingOn => "typing_on",
            SenderAction::TypingOff => "typing_off",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_engine_reply_deserializes_camel_case() {
        let reply: EngineReply = serde_json::from_str(
            r#"{"response": "Hi<br>there", "quickResponses": ["Yes", "No"], "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(reply.response, "Hi<br>there");
        assert_eq!(reply.quick_responses, vec!["Yes", "No"]);
    }

    #[test]
    fn test_engine_reply_missing_quick_responses_is_empty() {
        let reply: EngineReply = serde_json::from_str(r#"{"response": "Hi"}"#).unwrap();
        assert!(reply.quick_responses.is_empty());
    }

    #[test]
    fn test_engine_reply_missing_response_is_error() {
        let result: Result<EngineReply, _> = serde_json::from_str(r#"{"quickResponses": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_expiry() {
        let now = Utc::now();
        let mut record = SessionRecord::new("u1", "s1");
        assert!(!record.is_expired_at(now));

        record.expires_at = Some(now - Duration::seconds(1));
        assert!(record.is_expired_at(now));

        record.expires_at = Some(now + Duration::seconds(60));
        assert!(!record.is_expired_at(now));
    }

    #[test]
    fn test_inbound_event_constructors() {
        let text = InboundEvent::text("42", "hello");
        assert_eq!(text.user_id, "42");
        assert_eq!(text.content, EventContent::Text("hello".to_string()));

        let init = InboundEvent::initialize("42");
        assert_eq!(init.content, EventContent::Initialize);
        assert_ne!(text.id, init.id);
    }

    #[test]
    fn test_outbound_quick_response_detection() {
        let mut msg = OutboundMessage::text("Pick one");
        assert!(!msg.has_quick_responses());
        msg.quick_responses = Some(vec![]);
        assert!(!msg.has_quick_responses());
        msg.quick_responses = Some(vec!["A".to_string()]);
        assert!(msg.has_quick_responses());
    }

    #[test]
    fn test_sender_action_names() {
        assert_eq!(SenderAction::MarkSeen.as_str(), "mark_seen");
        assert_eq!(SenderAction::TypingOn.as_str(), "typing_on");
        assert_eq!(SenderAction::TypingOff.as_str(), "typing_off");
        assert_eq!(
            serde_json::to_string(&SenderAction::TypingOff).unwrap(),
            "\"typing_off\""
        );
    }
}
