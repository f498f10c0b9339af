//! Per-user single-flight locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anvik_models::ChatId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per chat id.
///
/// Holders of the guard for a key run alone; later callers wait and then
/// see whatever the first caller persisted. Entries nobody holds or waits on
/// are dropped on the next `lock`.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<ChatId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &ChatId) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Guards and waiters each hold a clone, so a count of one is idle.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(map.entry(key.clone()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
