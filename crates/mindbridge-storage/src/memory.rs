//! In-process session store with sliding expiry.
//!
//! Records become invisible once their idle timeout passes. Expired entries
//! are dropped lazily on lookup and in bulk by `purge_expired`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use mindbridge_core::error::MindbridgeError;
use mindbridge_core::types::SessionRecord;

use crate::store::{Retention, SessionStore};

/// Expiring session store. Bindings do not survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionRecord>>, MindbridgeError> {
        self.records
            .lock()
            .map_err(|e| MindbridgeError::Storage(format!("Session map lock poisoned: {}", e)))
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired record. Returns how many were dropped.
    pub fn purge_expired(&self) -> Result<usize, MindbridgeError> {
        let now = Utc::now();
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        Ok(before - records.len())
    }

    /// Run `purge_expired` on a fixed interval until the task is aborted.
    pub fn spawn_purge_task(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match self.purge_expired() {
                    Ok(0) => {}
                    Ok(purged) => debug!(purged, "Expired sessions purged"),
                    Err(e) => tracing::warn!(error = %e, "Session purge failed"),
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn retention(&self) -> Retention {
        Retention::Sliding
    }

    async fn find(&self, user_id: &str) -> Result<Option<SessionRecord>, MindbridgeError> {
        let now = Utc::now();
        let mut records = self.lock()?;
        match records.get(user_id).cloned() {
            Some(record) if record.is_expired_at(now) => {
                records.remove(user_id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn create(&self, user_id: &str, session_id: &str) -> Result<(), MindbridgeError> {
        let record = SessionRecord::new(user_id, session_id);
        self.lock()?.insert(user_id.to_string(), record);
        Ok(())
    }

    async fn put(
        &self,
        user_id: &str,
        session_id: &str,
        ttl: Duration,
    ) -> Result<(), MindbridgeError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| MindbridgeError::Storage(format!("Invalid session ttl: {}", e)))?;
        let mut record = SessionRecord::new(user_id, session_id);
        let expires_at = record
            .updated_at
            .checked_add_signed(ttl)
            .ok_or_else(|| MindbridgeError::Storage("Session ttl out of range".to_string()))?;
        record.expires_at = Some(expires_at);
        self.lock()?.insert(user_id.to_string(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_find() {
        let store = MemorySessionStore::new();
        store
            .put("user-1", "session-a", Duration::from_secs(60))
            .await
            .unwrap();

        let record = store.find("user-1").await.unwrap().unwrap();
        assert_eq!(record.session_id, "session-a");
        assert!(record.expires_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_expired_record_is_invisible_and_dropped() {
        let store = MemorySessionStore::new();
        store
            .put("user-1", "session-a", Duration::from_secs(0))
            .await
            .unwrap();

        assert!(store.find("user-1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_with_out_of_range_ttl_fails() {
        let store = MemorySessionStore::new();
        let result = store
            .put("user-1", "session-a", Duration::from_secs(10_000_000_000_000))
            .await;

        assert!(matches!(result, Err(MindbridgeError::Storage(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_slides_expiry_forward() {
        let store = MemorySessionStore::new();
        store
            .put("user-1", "session-a", Duration::from_secs(0))
            .await
            .unwrap();
        store
            .put("user-1", "session-a", Duration::from_secs(300))
            .await
            .unwrap();

        let record = store.find("user-1").await.unwrap().unwrap();
        assert_eq!(record.session_id, "session-a");
    }

    #[tokio::test]
    async fn test_create_has_no_expiry() {
        let store = MemorySessionStore::new();
        store.create("user-1", "session-a").await.unwrap();
        let record = store.find("user-1").await.unwrap().unwrap();
        assert!(record.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_counts_removed() {
        let store = MemorySessionStore::new();
        store.put("stale-1", "s1", Duration::from_secs(0)).await.unwrap();
        store.put("stale-2", "s2", Duration::from_secs(0)).await.unwrap();
        store.put("fresh", "s3", Duration::from_secs(600)).await.unwrap();

        assert_eq!(store.purge_expired().unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.find("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_task_runs() {
        let store = Arc::new(MemorySessionStore::new());
        store.put("stale", "s1", Duration::from_secs(0)).await.unwrap();

        let handle = Arc::clone(&store).spawn_purge_task(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(store.is_empty());
    }

    #[test]
    fn test_retention_is_sliding() {
        assert_eq!(MemorySessionStore::new().retention(), Retention::Sliding);
    }
}
