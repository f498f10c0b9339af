//! Core data models for Anvik.
//!
//! This crate provides the data types shared by every Anvik crate: the
//! per-chat user record, classified intents, reminders and tasks.

pub mod ids;
pub mod intent;
pub mod reminder;
pub mod task;
pub mod user;

pub use ids::{ChatId, ReminderId};
pub use intent::{Intent, IntentResult};
pub use reminder::Reminder;
pub use task::{NewTask, Task, TaskStatus, TaskUpdates};
pub use user::{GoogleTokens, Preferences, User, DEFAULT_TIMEZONE};
