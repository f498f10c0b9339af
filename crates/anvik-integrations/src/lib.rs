//! Integration adapters for Anvik.
//!
//! Every adapter wraps one vendor API behind a verb-based contract and
//! returns reply text. Provider failures are logged and turned into fixed
//! strings here; nothing escapes to the router as an error.
//!
//! The HTTP-facing pieces sit behind traits ([`CalendarApi`], [`NotionApi`],
//! [`GmailApi`], [`MailSender`], [`Notifier`]) so the adapters can be driven
//! by fakes in tests.

pub mod calendar;
pub mod email;
pub mod error;
pub mod google;
pub mod locks;
pub mod notion;
pub mod reminder;

pub use calendar::{CalendarAdapter, CalendarApi, HttpCalendarApi, DEFAULT_EVENT_LIMIT};
pub use email::{EmailAdapter, EmailSummary, GmailApi, HttpGmailApi, MailSender, OutgoingMail, SmtpMailer};
pub use error::{IntegrationError, Result};
pub use google::GoogleOAuth;
pub use locks::KeyedLocks;
pub use notion::{HttpNotionApi, NotionAdapter, NotionApi, NotionOAuth};
pub use reminder::{Notifier, ReminderScheduler};
