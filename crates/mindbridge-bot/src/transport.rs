//! Chat platform transport.
//!
//! Sends indicators and messages to a user and looks up their display
//! profile. `MessengerClient` talks to the Messenger Graph API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use mindbridge_core::config::{BotConfig, EngineConfig, MessengerConfig};
use mindbridge_core::types::{SenderAction, UserProfile};

use crate::error::BotError;

/// Platform limit on quick reply title length, in characters.
pub const QUICK_REPLY_TITLE_LIMIT: usize = 20;

/// Platform limit on quick replies per message.
pub const QUICK_REPLY_LIMIT: usize = 13;

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_action(&self, user_id: &str, action: SenderAction) -> Result<(), BotError>;

    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), BotError>;

    /// Send text with tappable quick reply chips.
    async fn send_quick_replies(
        &self,
        user_id: &str,
        text: &str,
        replies: &[String],
    ) -> Result<(), BotError>;

    /// Fetch the user's display names. `Ok(None)` when the platform knows no
    /// name for the user.
    async fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BotError>;
}

#[derive(Serialize)]
struct QuickReply {
    content_type: &'static str,
    title: String,
    payload: String,
}

impl QuickReply {
    fn from_text(text: &str) -> Self {
        Self {
            content_type: "text",
            title: text.chars().take(QUICK_REPLY_TITLE_LIMIT).collect(),
            payload: text.to_string(),
        }
    }
}

/// Messenger Send API and User Profile API client.
#[derive(Clone, Debug)]
pub struct MessengerClient {
    graph_api_url: String,
    access_token: String,
    http_client: reqwest::Client,
}

impl MessengerClient {
    pub fn new(
        graph_api_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BotError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            graph_api_url: graph_api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            http_client,
        })
    }

    pub fn from_config(
        messenger: &MessengerConfig,
        bot: &BotConfig,
        engine: &EngineConfig,
    ) -> Result<Self, BotError> {
        Self::new(
            &messenger.graph_api_url,
            &bot.access_token,
            engine.request_timeout(),
        )
    }

    async fn send(&self, body: serde_json::Value) -> Result<(), BotError> {
        let url = format!("{}/me/messages", self.graph_api_url);
        let response = self
            .http_client
            .post(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!("Send API returned {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MessengerClient {
    async fn send_action(&self, user_id: &str, action: SenderAction) -> Result<(), BotError> {
        self.send(json!({
            "recipient": { "id": user_id },
            "sender_action": action.as_str(),
        }))
        .await
    }

    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), BotError> {
        self.send(json!({
            "recipient": { "id": user_id },
            "message": { "text": text },
        }))
        .await
    }

    async fn send_quick_replies(
        &self,
        user_id: &str,
        text: &str,
        replies: &[String],
    ) -> Result<(), BotError> {
        let quick_replies: Vec<QuickReply> = replies
            .iter()
            .take(QUICK_REPLY_LIMIT)
            .map(|reply| QuickReply::from_text(reply))
            .collect();

        self.send(json!({
            "recipient": { "id": user_id },
            "message": { "text": text, "quick_replies": quick_replies },
        }))
        .await
    }

    async fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, BotError> {
        let mut url = reqwest::Url::parse(&self.graph_api_url)
            .map_err(|e| BotError::Profile(format!("Invalid Graph API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BotError::Profile("Graph API URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push(user_id);
        let response = self
            .http_client
            .get(url)
            .query(&[
                ("fields", "first_name,last_name"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BotError::Profile(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Profile(format!(
                "User Profile API returned {}",
                response.status()
            )));
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| BotError::Profile(e.to_string()))?;
        debug!(user_id, "Fetched user profile");

        if profile.first_name.trim().is_empty() && profile.last_name.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(profile))
    }
}
