//! Durable queue of pending reminders.

use std::path::{Path, PathBuf};

use anvik_models::{ChatId, Reminder, ReminderId};
use tokio::sync::Mutex;
use tracing::debug;

use crate::atomic::{read_json_async, write_json_async};
use crate::error::Result;

/// Pending reminders, kept in a single `reminders.json` document.
///
/// A reminder is added before its timer is armed and removed once delivered,
/// so whatever is on disk at startup is exactly what still needs to fire.
pub struct ReminderStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReminderStore {
    /// Creates a store at `base_path/reminders.json`.
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            path: base_path.as_ref().join("reminders.json"),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<Reminder>> {
        Ok(read_json_async(&self.path).await?.unwrap_or_default())
    }

    /// Persists a new reminder.
    pub async fn add(&self, reminder: &Reminder) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        all.push(reminder.clone());
        write_json_async(&self.path, &all).await?;
        debug!(id = %reminder.id, chat_id = %reminder.chat_id, "Reminder persisted");
        Ok(())
    }

    /// Removes a reminder; returns whether it was present.
    pub async fn remove(&self, id: &ReminderId) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        let before = all.len();
        all.retain(|r| &r.id != id);
        if all.len() == before {
            return Ok(false);
        }
        write_json_async(&self.path, &all).await?;
        Ok(true)
    }

    /// All pending reminders, soonest first.
    pub async fn pending(&self) -> Result<Vec<Reminder>> {
        let _guard = self.lock.lock().await;
        let mut all = self.load().await?;
        all.sort_by_key(|r| r.fire_at);
        Ok(all)
    }

    /// Pending reminders for one chat, soonest first.
    pub async fn pending_for(&self, chat_id: &ChatId) -> Result<Vec<Reminder>> {
        Ok(self
            .pending()
            .await?
            .into_iter()
            .filter(|r| &r.chat_id == chat_id)
            .collect())
    }
}
