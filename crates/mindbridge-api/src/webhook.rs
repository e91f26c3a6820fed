//! Webhook delivery payloads.

use serde::{Deserialize, Serialize};

use mindbridge_bot::MessagingEvent;

/// Query parameters of the subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl VerifyParams {
    /// The challenge to echo back, if the handshake is valid for `token`.
    pub fn accepted_challenge(&self, token: &str) -> Option<&str> {
        if self.mode.as_deref() != Some("subscribe") {
            return None;
        }
        if token.is_empty() || self.verify_token.as_deref() != Some(token) {
            return None;
        }
        self.challenge.as_deref()
    }
}

/// Body of a webhook delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

/// Batch of events for one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookEntry {
    /// Page id.
    pub id: String,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}
