//! Per-user exclusion for conversation exchanges.
//!
//! Two events from the same user must not both observe "no session" and
//! open two engine sessions. Holding a user's lock for the whole exchange
//! also keeps that user's replies in arrival order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Registry of per-user async locks. Entries are pruned once nobody holds
/// or waits on them.
#[derive(Debug, Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive access to `user_id`.
    pub async fn acquire(&self, user_id: &str) -> UserLockGuard<'_> {
        let slot = Arc::clone(self.slots().entry(user_id.to_string()).or_default());
        let guard = slot.lock_owned().await;
        UserLockGuard {
            locks: self,
            user_id: user_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of users with a live lock entry.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one user's conversation. Released on drop.
#[derive(Debug)]
pub struct UserLockGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.slots();
        if slots
            .get(&self.user_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.user_id);
        }
    }
}
