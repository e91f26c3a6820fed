//! SQLite-backed session store with no expiry.
//!
//! Queries run on the blocking thread pool so the async runtime never waits
//! on the database mutex or disk I/O.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::OptionalExtension;

use mindbridge_core::error::MindbridgeError;
use mindbridge_core::types::SessionRecord;

use crate::db::Database;
use crate::store::{Retention, SessionStore};

/// Durable session store: bindings persist until replaced.
#[derive(Clone, Debug)]
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, MindbridgeError>
    where
        F: FnOnce(&Database) -> Result<T, MindbridgeError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| MindbridgeError::Storage(format!("Storage task failed: {}", e)))?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn retention(&self) -> Retention {
        Retention::Durable
    }

    async fn find(&self, user_id: &str) -> Result<Option<SessionRecord>, MindbridgeError> {
        let user_id = user_id.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                conn.query_row(
                    "SELECT user_id, session_id, updated_at FROM bot_sessions WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| {
                        let updated_at: i64 = row.get(2)?;
                        Ok(SessionRecord {
                            user_id: row.get(0)?,
                            session_id: row.get(1)?,
                            updated_at: Utc
                                .timestamp_opt(updated_at, 0)
                                .single()
                                .unwrap_or_else(Utc::now),
                            expires_at: None,
                        })
                    },
                )
                .optional()
                .map_err(|e| MindbridgeError::Storage(format!("Failed to find session: {}", e)))
            })
        })
        .await
    }

    async fn create(&self, user_id: &str, session_id: &str) -> Result<(), MindbridgeError> {
        let user_id = user_id.to_string();
        let session_id = session_id.to_string();
        self.blocking(move |db| {
            db.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO bot_sessions (user_id, session_id, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (user_id) DO UPDATE
                     SET session_id = excluded.session_id, updated_at = excluded.updated_at",
                    rusqlite::params![user_id, session_id, Utc::now().timestamp()],
                )
                .map_err(|e| MindbridgeError::Storage(format!("Failed to save session: {}", e)))?;
                Ok(())
            })
        })
        .await
    }
}
