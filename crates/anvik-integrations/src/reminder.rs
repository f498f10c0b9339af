//! Durable reminders.
//!
//! Each reminder is written to the [`ReminderStore`] before its timer is
//! armed and removed after delivery, so `recover` can re-arm whatever was
//! pending when the process stopped. A failed delivery keeps the record and
//! tries again after [`DELIVERY_RETRY`].

use std::sync::Arc;
use std::time::Duration;

use anvik_core::datetime::{format_for_reply, next_occurrence, parse_clock, parse_timezone};
use anvik_models::{ChatId, Reminder};
use anvik_persistence::{ReminderStore, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Reply for any time the parser rejects.
pub const INVALID_TIME: &str = "⚠️ Invalid time format. Use HH:MM or h:mm AM/PM";

/// Wait before retrying a reminder the notifier could not deliver.
pub const DELIVERY_RETRY: Duration = Duration::from_secs(60);

/// Pushes text to a chat outside of a request/reply cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: &ChatId, text: &str) -> Result<()>;
}

/// Schedules reminders and delivers them through a [`Notifier`].
#[derive(Clone)]
pub struct ReminderScheduler {
    reminders: Arc<ReminderStore>,
    users: Arc<UserStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderScheduler {
    pub fn new(reminders: Arc<ReminderStore>, users: Arc<UserStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            reminders,
            users,
            notifier,
        }
    }

    /// Schedules from `details.message` and `details.time`.
    pub async fn schedule(&self, details: &Map<String, Value>, chat_id: &ChatId) -> String {
        self.schedule_at(details, chat_id, Utc::now()).await
    }

    pub async fn schedule_at(&self, details: &Map<String, Value>, chat_id: &ChatId, now: DateTime<Utc>) -> String {
        let text = |key: &str| {
            details
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let Some(message) = text("message").or_else(|| text("task")) else {
            return "⚠️ What should I remind you about? e.g. `remind me to call mom at 8pm`".to_string();
        };
        let Some(time) = text("time").and_then(parse_clock) else {
            return INVALID_TIME.to_string();
        };

        let tz = match self.users.get(chat_id).await {
            Some(user) => parse_timezone(&user.prefs.timezone),
            None => chrono_tz::Tz::UTC,
        };
        let Some(fire_local) = next_occurrence(time, tz, now) else {
            return INVALID_TIME.to_string();
        };

        let reminder = Reminder::new(chat_id.clone(), fire_local.with_timezone(&Utc), message);
        if let Err(e) = self.reminders.add(&reminder).await {
            error!(chat_id = %chat_id, error = %e, "Failed to persist reminder");
            return "❌ Failed to schedule the reminder. Please try again.".to_string();
        }

        info!(chat_id = %chat_id, id = %reminder.id, fire_at = %reminder.fire_at, "Reminder scheduled");
        self.arm(reminder, now);
        format!("⏰ Reminder scheduled for {}.", format_for_reply(&fire_local))
    }

    /// Re-arms every persisted reminder; overdue ones fire right away.
    pub async fn recover(&self) -> Result<usize> {
        let pending = self.reminders.pending().await?;
        let now = Utc::now();
        let count = pending.len();
        for reminder in pending {
            if reminder.is_due(now) {
                debug!(id = %reminder.id, "Reminder overdue, firing now");
            }
            self.arm(reminder, now);
        }
        info!(count, "Reminders recovered");
        Ok(count)
    }

    fn arm(&self, reminder: Reminder, now: DateTime<Utc>) {
        self.arm_in(reminder.delay_from(now), reminder);
    }

    fn arm_in(&self, delay: Duration, reminder: Reminder) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(reminder).await;
        });
    }

    /// Delivers one reminder. The record is removed once the notifier accepts
    /// it or the user is gone; otherwise it stays stored and is re-armed.
    async fn fire(&self, reminder: Reminder) {
        if self.users.get(&reminder.chat_id).await.is_some() {
            let text = format!("⏰ Reminder: {}", reminder.message);
            if let Err(e) = self.notifier.notify(&reminder.chat_id, &text).await {
                error!(
                    chat_id = %reminder.chat_id,
                    id = %reminder.id,
                    error = %e,
                    retry_in_secs = DELIVERY_RETRY.as_secs(),
                    "Reminder delivery failed"
                );
                self.arm_in(DELIVERY_RETRY, reminder);
                return;
            }
        } else {
            warn!(chat_id = %reminder.chat_id, "Dropping reminder for unknown user");
        }
        if let Err(e) = self.reminders.remove(&reminder.id).await {
            error!(id = %reminder.id, error = %e, "Failed to remove delivered reminder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Timelike};
    use serde_json::json;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, chat_id: &ChatId, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id.clone(), text.to_string()));
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _chat_id: &ChatId, _text: &str) -> Result<()> {
            Err(crate::error::IntegrationError::Provider {
                service: "Telegram",
                status: 502,
                body: "Bad Gateway".into(),
            })
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        reminders: Arc<ReminderStore>,
        users: Arc<UserStore>,
        notifier: Arc<RecordingNotifier>,
        scheduler: ReminderScheduler,
    }

    async fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let reminders = Arc::new(ReminderStore::new(dir.path()));
        let users = Arc::new(UserStore::open(dir.path()).unwrap());
        users.get_or_create(&ChatId::from("1")).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = ReminderScheduler::new(
            Arc::clone(&reminders),
            Arc::clone(&users),
            notifier.clone(),
        );
        Fixture {
            _dir: dir,
            reminders,
            users,
            notifier,
            scheduler,
        }
    }

    fn details(message: &str, time: &str) -> Map<String, Value> {
        json!({ "message": message, "time": time })
            .as_object()
            .cloned()
            .unwrap()
    }

    async fn wait_for_delivery(notifier: &RecordingNotifier, count: usize) {
        for _ in 0..200 {
            if notifier.sent.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("reminder was not delivered");
    }

    #[tokio::test]
    async fn test_past_time_rolls_to_next_day() {
        let f = fixture().await;
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 21, 0, 0).unwrap();

        let reply = f.scheduler.schedule_at(&details("stretch", "20:00"), &ChatId::from("1"), now).await;
        assert!(reply.starts_with("⏰ Reminder scheduled for 11 Jun 2025"));

        let pending = f.reminders.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].fire_at > now);
        assert_eq!(pending[0].fire_at.hour(), 20);
    }

    #[tokio::test]
    async fn test_evening_reminder_same_day_in_user_zone() {
        let f = fixture().await;
        f.users
            .update(&ChatId::from("1"), |u| u.prefs.timezone = "Asia/Kolkata".into())
            .await
            .unwrap();
        // 10:00 in Kolkata
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 4, 30, 0).unwrap();

        let reply = f.scheduler.schedule_at(&details("call mom", "8pm"), &ChatId::from("1"), now).await;
        assert_eq!(reply, "⏰ Reminder scheduled for 10 Jun 2025, 08:00 PM.");
    }

    #[tokio::test]
    async fn test_invalid_and_missing_input() {
        let f = fixture().await;
        let chat = ChatId::from("1");
        assert_eq!(f.scheduler.schedule(&details("x", "soonish"), &chat).await, INVALID_TIME);
        assert_eq!(f.scheduler.schedule(&details("x", ""), &chat).await, INVALID_TIME);
        assert!(f
            .scheduler
            .schedule(&details("", "8pm"), &chat)
            .await
            .contains("remind you about"));
        assert!(f.reminders.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fires_and_removes() {
        let f = fixture().await;
        let reminder = Reminder::new("1", Utc::now() + Duration::milliseconds(20), "drink water");
        f.reminders.add(&reminder).await.unwrap();
        f.scheduler.arm(reminder, Utc::now());

        wait_for_delivery(&f.notifier, 1).await;
        let sent = f.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent[0].1, "⏰ Reminder: drink water");

        for _ in 0..100 {
            if f.reminders.pending().await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("delivered reminder was not removed");
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_reminder() {
        let f = fixture().await;
        let scheduler = ReminderScheduler::new(
            Arc::clone(&f.reminders),
            Arc::clone(&f.users),
            Arc::new(FailingNotifier),
        );
        let reminder = Reminder::new("1", Utc::now() - Duration::seconds(1), "pay rent");
        f.reminders.add(&reminder).await.unwrap();

        scheduler.fire(reminder.clone()).await;

        let pending = f.reminders.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, reminder.id);
    }

    #[tokio::test]
    async fn test_unknown_user_reminder_is_dropped() {
        let f = fixture().await;
        let reminder = Reminder::new("999", Utc::now(), "orphan");
        f.reminders.add(&reminder).await.unwrap();

        f.scheduler.fire(reminder).await;

        assert!(f.reminders.pending().await.unwrap().is_empty());
        assert!(f.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recover_fires_overdue() {
        let f = fixture().await;
        f.reminders
            .add(&Reminder::new("1", Utc::now() - Duration::minutes(3), "missed while down"))
            .await
            .unwrap();
        f.reminders
            .add(&Reminder::new("1", Utc::now() + Duration::hours(2), "later"))
            .await
            .unwrap();

        assert_eq!(f.scheduler.recover().await.unwrap(), 2);
        wait_for_delivery(&f.notifier, 1).await;
        let sent = f.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "⏰ Reminder: missed while down");
    }
}
