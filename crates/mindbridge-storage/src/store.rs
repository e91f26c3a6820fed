//! Session store trait definition.

use std::time::Duration;

use async_trait::async_trait;

use mindbridge_core::error::MindbridgeError;
use mindbridge_core::types::SessionRecord;

/// How long a binding survives in a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    /// Bindings persist until replaced; written only when a session is created.
    Durable,
    /// Bindings expire after an idle timeout; every event rewrites the record
    /// and slides the expiry forward.
    Sliding,
}

/// Durable mapping from platform user id to dialogue-engine session id.
///
/// At most one record exists per user. Writes replace any existing binding
/// (last write wins).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Retention behaviour; decides when the orchestrator writes.
    fn retention(&self) -> Retention;

    /// Look up the active binding for a user.
    async fn find(&self, user_id: &str) -> Result<Option<SessionRecord>, MindbridgeError>;

    /// Store a new binding, replacing any existing one.
    async fn create(&self, user_id: &str, session_id: &str) -> Result<(), MindbridgeError>;

    /// Upsert a binding that expires after `ttl` of inactivity.
    ///
    /// Stores without expiry ignore `ttl`.
    async fn put(
        &self,
        user_id: &str,
        session_id: &str,
        _ttl: Duration,
    ) -> Result<(), MindbridgeError> {
        self.create(user_id, session_id).await
    }
}
