//! Conversation orchestrator: one inbound event in, chat messages out.
//!
//! Binds the user to an engine session (creating one on first contact),
//! forwards the user's content, translates the reply and delivers it. Any
//! failure on the way to a reply is replaced by a single fallback message.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mindbridge_core::config::BotConfig;
use mindbridge_core::types::{
    EventContent, InboundEvent, OutboundMessage, SenderAction, INIT_TOKEN,
};
use mindbridge_storage::{Retention, SessionStore};

use crate::engine::{DialogueEngine, NewSession};
use crate::error::BotError;
use crate::locks::UserLocks;
use crate::transport::ChatTransport;
use crate::translator::translate;

/// Outcome of handling one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Messages produced for the user (translated or fallback).
    pub produced: usize,
    /// Messages the transport accepted.
    pub delivered: usize,
    /// Whether the fallback message replaced the engine reply.
    pub fallback: bool,
}

/// A failed exchange step and its cause.
type StepError = (&'static str, BotError);

/// Central coordinator between the chat platform and the dialogue engine.
pub struct Orchestrator {
    config: Arc<BotConfig>,
    store: Arc<dyn SessionStore>,
    engine: Arc<dyn DialogueEngine>,
    transport: Arc<dyn ChatTransport>,
    locks: UserLocks,
}

impl Orchestrator {
    pub fn new(
        config: Arc<BotConfig>,
        store: Arc<dyn SessionStore>,
        engine: Arc<dyn DialogueEngine>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            transport,
            locks: UserLocks::new(),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Handle one inbound event end to end. Never fails; problems are logged
    /// and surface to the user as the fallback message.
    pub async fn handle_event(&self, event: InboundEvent) -> DeliveryReport {
        let indicators = self.spawn_indicators(&event);

        let _guard = if self.config.serialize_per_user {
            Some(self.locks.acquire(&event.user_id).await)
        } else {
            None
        };

        let (messages, fallback) = match self.exchange(&event).await {
            Ok(messages) => (messages, false),
            Err((operation, e)) => {
                error!(
                    user_id = %event.user_id,
                    event_id = %event.id,
                    operation,
                    error = %e,
                    "Exchange failed, sending fallback message"
                );
                (vec![OutboundMessage::text(&self.config.error_message)], true)
            }
        };

        let delivered = self.deliver(&event, &messages, indicators).await;
        DeliveryReport {
            produced: messages.len(),
            delivered,
            fallback,
        }
    }

    /// Open a new engine session for `user_id` and return its id.
    pub async fn resolve_session_id(&self, user_id: &str) -> Result<String, BotError> {
        let session = NewSession {
            story: self.config.story.clone(),
            locale: self.config.locale.clone(),
            time_zone: self.config.timezone.clone(),
            visitor: self.resolve_visitor(user_id).await,
        };
        let session_id = self.engine.create_session(&session).await?;
        info!(user_id, session_id = %session_id, "Created engine session");
        Ok(session_id)
    }

    /// Describe the user for the engine: `"First Last (id)"`, or a
    /// placeholder naming the raw id when no profile is available.
    pub async fn resolve_visitor(&self, user_id: &str) -> String {
        let profile = match self.transport.user_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, error = %e, "Profile lookup failed");
                None
            }
        };

        let name = profile
            .map(|p| {
                [p.first_name.trim(), p.last_name.trim()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        if name.is_empty() {
            format!("Unidentified facebook user with id {}", user_id)
        } else {
            format!("{} ({})", name, user_id)
        }
    }

    async fn exchange(&self, event: &InboundEvent) -> Result<Vec<OutboundMessage>, StepError> {
        let user_id = event.user_id.as_str();

        let existing = match &event.content {
            EventContent::Initialize => None,
            EventContent::Text(_) => self
                .store
                .find(user_id)
                .await
                .map_err(|e| ("find_session", BotError::from(e)))?
                .map(|record| record.session_id),
        };

        let (session_id, content, created) = match (existing, &event.content) {
            (Some(session_id), EventContent::Text(text)) => (session_id, text.as_str(), false),
            _ => {
                let session_id = self
                    .resolve_session_id(user_id)
                    .await
                    .map_err(|e| ("create_session", e))?;
                (session_id, INIT_TOKEN, true)
            }
        };

        self.persist(event, &session_id, created).await;

        let reply = self
            .engine
            .create_message(&session_id, content)
            .await
            .map_err(|e| ("create_message", e))?;
        debug!(
            user_id,
            event_id = %event.id,
            session_id = %session_id,
            quick_responses = reply.quick_responses.len(),
            "Engine replied"
        );

        Ok(translate(&reply))
    }

    async fn persist(&self, event: &InboundEvent, session_id: &str, created: bool) {
        let user_id = event.user_id.as_str();
        let result = match self.store.retention() {
            Retention::Sliding => {
                self.store
                    .put(user_id, session_id, self.config.max_idle_session())
                    .await
            }
            Retention::Durable if created => self.store.create(user_id, session_id).await,
            Retention::Durable => return,
        };

        if let Err(e) = result {
            warn!(
                user_id,
                event_id = %event.id,
                session_id,
                error = %e,
                "Failed to store session binding"
            );
        }
    }

    async fn deliver(
        &self,
        event: &InboundEvent,
        messages: &[OutboundMessage],
        indicators: JoinHandle<()>,
    ) -> usize {
        let user_id = event.user_id.as_str();

        // typing_off must not overtake typing_on.
        if let Err(e) = indicators.await {
            debug!(user_id, error = %e, "Indicator task did not finish");
        }

        if let Err(e) = self
            .transport
            .send_action(user_id, SenderAction::TypingOff)
            .await
        {
            debug!(user_id, error = %e, "typing_off failed");
        }

        let mut delivered = 0;
        for (index, message) in messages.iter().enumerate() {
            let result = match &message.quick_responses {
                Some(replies) if !replies.is_empty() => {
                    self.transport
                        .send_quick_replies(user_id, &message.text, replies)
                        .await
                }
                _ => self.transport.send_text(user_id, &message.text).await,
            };
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    user_id,
                    event_id = %event.id,
                    index,
                    error = %e,
                    "Message delivery failed"
                ),
            }
        }
        delivered
    }

    /// Mark the event seen and show typing while the exchange runs.
    fn spawn_indicators(&self, event: &InboundEvent) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let user_id = event.user_id.clone();
        tokio::spawn(async move {
            for action in [SenderAction::MarkSeen, SenderAction::TypingOn] {
                if let Err(e) = transport.send_action(&user_id, action).await {
                    debug!(
                        user_id = %user_id,
                        action = action.as_str(),
                        error = %e,
                        "Indicator failed"
                    );
                }
            }
        })
    }
}
