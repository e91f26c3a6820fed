//! Dialogue engine client.
//!
//! The engine owns the conversation: it issues session ids and answers each
//! message with markup text plus optional quick responses.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mindbridge_core::config::{BotConfig, EngineConfig};
use mindbridge_core::types::EngineReply;

use crate::error::BotError;

/// Parameters for opening a conversation with the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub story: String,
    pub locale: String,
    pub time_zone: String,
    /// Human-readable description of who is talking.
    pub visitor: String,
}

/// Remote dialogue engine.
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    /// Open a session and return its id.
    async fn create_session(&self, session: &NewSession) -> Result<String, BotError>;

    /// Submit one piece of user content to a session.
    async fn create_message(&self, session_id: &str, content: &str)
        -> Result<EngineReply, BotError>;
}

#[derive(Deserialize)]
struct CreatedSession {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    session_id: &'a str,
    content: &'a str,
}

/// HTTP client for the engine's `sessions` and `messages` resources.
#[derive(Clone, Debug)]
pub struct HttpDialogueEngine {
    base_url: String,
    client_id: String,
    client_secret: String,
    http_client: reqwest::Client,
}

impl HttpDialogueEngine {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BotError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Engine(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http_client,
        })
    }

    pub fn from_config(bot: &BotConfig, engine: &EngineConfig) -> Result<Self, BotError> {
        Self::new(
            &bot.api_url,
            &bot.client_id,
            &bot.client_secret,
            engine.request_timeout(),
        )
    }

    async fn post<B, R>(&self, resource: &str, body: &B) -> Result<R, BotError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, resource);
        debug!(url = %url, "Engine request");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::Engine(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BotError::Engine(e.to_string()))?;

        if !status.is_success() {
            return Err(BotError::EngineStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| BotError::MalformedReply(e.to_string()))
    }
}

#[async_trait]
impl DialogueEngine for HttpDialogueEngine {
    async fn create_session(&self, session: &NewSession) -> Result<String, BotError> {
        let created: CreatedSession = self.post("sessions", session).await?;
        Ok(created.id)
    }

    async fn create_message(
        &self,
        session_id: &str,
        content: &str,
    ) -> Result<EngineReply, BotError> {
        self.post(
            "messages",
            &MessageRequest {
                session_id,
                content,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    // base64("client:secret")
    const AUTH: &str = "Basic Y2xpZW50OnNlY3JldA==";

    fn engine(url: &str) -> HttpDialogueEngine {
        HttpDialogueEngine::new(url, "client", "secret", Duration::from_secs(5)).unwrap()
    }

    fn new_session() -> NewSession {
        NewSession {
            story: "story-1".to_string(),
            locale: "fi".to_string(),
            time_zone: "Europe/Helsinki".to_string(),
            visitor: "Matti Meikäläinen (123)".to_string(),
        }
    }

    #[test]
    fn test_new_session_wire_names() {
        let value = serde_json::to_value(new_session()).unwrap();
        assert_eq!(value["timeZone"], "Europe/Helsinki");
        assert!(value.get("time_zone").is_none());
    }

    #[tokio::test]
    async fn test_create_session_returns_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sessions")
            .match_header("authorization", AUTH)
            .match_body(Matcher::Json(json!({
                "story": "story-1",
                "locale": "fi",
                "timeZone": "Europe/Helsinki",
                "visitor": "Matti Meikäläinen (123)"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"sess-42","extra":true}"#)
            .create_async()
            .await;

        let id = engine(&server.url())
            .create_session(&new_session())
            .await
            .unwrap();
        assert_eq!(id, "sess-42");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_message_decodes_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("authorization", AUTH)
            .match_body(Matcher::Json(json!({
                "sessionId": "sess-42",
                "content": "INIT"
            })))
            .with_status(200)
            .with_body(r#"{"response":"Hei<br>Mitä kuuluu?","quickResponses":["Hyvää","Huonoa"]}"#)
            .create_async()
            .await;

        let reply = engine(&server.url())
            .create_message("sess-42", "INIT")
            .await
            .unwrap();
        assert_eq!(reply.response, "Hei<br>Mitä kuuluu?");
        assert_eq!(reply.quick_responses, vec!["Hyvää", "Huonoa"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_quick_responses_default_to_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"response":"ok"}"#)
            .create_async()
            .await;

        let reply = engine(&server.url())
            .create_message("s", "hello")
            .await
            .unwrap();
        assert!(reply.quick_responses.is_empty());
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sessions")
            .with_status(200)
            .with_body(r#"{"id":"x"}"#)
            .create_async()
            .await;

        let url = format!("{}/", server.url());
        engine(&url).create_session(&new_session()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_engine_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = engine(&server.url())
            .create_message("s", "hello")
            .await
            .unwrap_err();
        match err {
            BotError::EngineStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed_reply() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"unexpected":1}"#)
            .create_async()
            .await;

        let err = engine(&server.url())
            .create_message("s", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::MalformedReply(_)));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_engine_error() {
        // Port 9 (discard) is not listening in test environments.
        let err = engine("http://127.0.0.1:9")
            .create_session(&new_session())
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Engine(_)));
    }
}
