//! User document store.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anvik_models::{ChatId, User};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::atomic::{ensure_dir, read_json, write_json_async};
use crate::error::{PersistenceError, Result};

/// Retry policy for opening the store at startup.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Persists one JSON document per chat identity.
///
/// ```text
/// base_path/
/// └── users/
///     ├── 123456789.json
///     └── -100200300.json
/// ```
///
/// All documents are loaded into memory on open. Writes go to disk first and
/// only update the cache once the file has been replaced, under a single
/// write lock, so `update` is an atomic read-modify-write per store.
pub struct UserStore {
    dir: PathBuf,
    cache: RwLock<HashMap<ChatId, User>>,
}

impl UserStore {
    /// Opens (creating if needed) the store rooted at `base_path`.
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let dir = base_path.as_ref().join("users");
        ensure_dir(&dir)?;

        let entries = fs::read_dir(&dir).map_err(|source| PersistenceError::ReadError {
            path: dir.clone(),
            source,
        })?;

        let mut users = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match read_json::<User>(&path) {
                Ok(Some(user)) => {
                    users.insert(user.chat_id.clone(), user);
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable user document"),
            }
        }

        info!(dir = %dir.display(), users = users.len(), "User store opened");
        Ok(Self {
            dir,
            cache: RwLock::new(users),
        })
    }

    /// Opens the store, retrying with a fixed delay before giving up.
    pub async fn connect(base_path: impl AsRef<Path>, policy: RetryPolicy) -> Result<Self> {
        let base_path = base_path.as_ref();
        let attempts = policy.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match Self::open(base_path) {
                Ok(store) => return Ok(store),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "User store connection failed");
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }

        Err(PersistenceError::Unavailable {
            attempts,
            last_error,
        })
    }

    fn user_path(&self, chat_id: &ChatId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(chat_id)))
    }

    /// Whether the backing directory is still reachable.
    pub fn is_available(&self) -> bool {
        self.dir.is_dir()
    }

    /// Number of known users.
    pub async fn count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Looks up a user.
    pub async fn get(&self, chat_id: &ChatId) -> Option<User> {
        self.cache.read().await.get(chat_id).cloned()
    }

    /// Returns the user, creating a bare record on first contact.
    ///
    /// The flag is `true` when the record was created by this call.
    pub async fn get_or_create(&self, chat_id: &ChatId) -> Result<(User, bool)> {
        if let Some(user) = self.get(chat_id).await {
            return Ok((user, false));
        }

        let mut cache = self.cache.write().await;
        // Another task may have created it between the two locks
        if let Some(user) = cache.get(chat_id) {
            return Ok((user.clone(), false));
        }

        let user = User::new(chat_id.clone());
        write_json_async(&self.user_path(chat_id), &user).await?;
        cache.insert(chat_id.clone(), user.clone());
        debug!(chat_id = %chat_id, "Created user record");
        Ok((user, true))
    }

    /// Applies `f` to the user (created if absent) and persists the result.
    ///
    /// Returns whatever `f` returns. If the write fails the cached record is
    /// left untouched.
    pub async fn update<F, R>(&self, chat_id: &ChatId, f: F) -> Result<R>
    where
        F: FnOnce(&mut User) -> R,
    {
        let mut cache = self.cache.write().await;
        let mut user = cache
            .get(chat_id)
            .cloned()
            .unwrap_or_else(|| User::new(chat_id.clone()));

        let out = f(&mut user);
        write_json_async(&self.user_path(chat_id), &user).await?;
        cache.insert(chat_id.clone(), user);
        Ok(out)
    }
}

/// File-system safe name for a chat id.
fn file_stem(chat_id: &ChatId) -> String {
    chat_id
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_string()
            } else {
                format!("%{:02X}", c as u32)
            }
        })
        .collect()
}
