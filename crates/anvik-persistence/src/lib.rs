//! Persistence layer for Anvik.
//!
//! This crate provides crash-safe persistence for user records and pending
//! reminders using atomic file operations (write to temp file, then rename).
//!
//! # Example
//!
//! ```no_run
//! use anvik_models::ChatId;
//! use anvik_persistence::{RetryPolicy, UserStore};
//!
//! # async fn run() -> anvik_persistence::Result<()> {
//! let store = UserStore::connect("/home/user/.anvik", RetryPolicy::default()).await?;
//! let (user, created) = store.get_or_create(&ChatId::from("12345")).await?;
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod error;
pub mod reminder_store;
pub mod user_store;

pub use error::{PersistenceError, Result};
pub use reminder_store::ReminderStore;
pub use user_store::{RetryPolicy, UserStore};
