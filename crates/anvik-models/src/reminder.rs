//! Scheduled reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, ReminderId};

/// A message to deliver to a chat at a fixed instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub chat_id: ChatId,
    pub fire_at: DateTime<Utc>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Creates a new reminder.
    pub fn new(chat_id: impl Into<ChatId>, fire_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            id: ReminderId::new(),
            chat_id: chat_id.into(),
            fire_at,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Whether the reminder is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }

    /// Time left until firing; zero when overdue.
    pub fn delay_from(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.fire_at - now).to_std().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_delay_clamps_to_zero() {
        let now = Utc::now();
        let overdue = Reminder::new("1", now - Duration::minutes(5), "late");
        assert!(overdue.is_due(now));
        assert_eq!(overdue.delay_from(now), std::time::Duration::ZERO);

        let future = Reminder::new("1", now + Duration::seconds(90), "soon");
        assert!(!future.is_due(now));
        assert_eq!(future.delay_from(now).as_secs(), 90);
    }
}
