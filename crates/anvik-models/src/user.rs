//! Per-chat user record.
//!
//! One `User` exists for every chat identity that has ever talked to the
//! bot. It starts out holding nothing but the chat id and is filled in as
//! the user connects each integration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

/// Default timezone for new users.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// OAuth2 token bundle returned by Google.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl GoogleTokens {
    /// Whether the access token is past its expiry at `now_ms`.
    ///
    /// Tokens without an expiry are treated as valid.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expiry_date.is_some_and(|exp| now_ms >= exp)
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// IANA timezone name.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Persisted record for a single chat participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub chat_id: ChatId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleTokens>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_database_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_parent_page_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    /// Pending login code. Stored as a string so leading zeros survive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_otp: Option<String>,

    /// Expiry of `email_otp` as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_otp_expires: Option<i64>,

    /// Wrong codes entered against the pending OTP.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub email_otp_attempts: u32,

    #[serde(default)]
    pub prefs: Preferences,
}

impl User {
    /// Creates a bare record holding only the chat identity.
    pub fn new(chat_id: impl Into<ChatId>) -> Self {
        Self {
            chat_id: chat_id.into(),
            name: None,
            created_at: Utc::now(),
            google: None,
            notion_token: None,
            notion_database_id: None,
            notion_parent_page_id: None,
            email: None,
            email_verified: false,
            email_otp: None,
            email_otp_expires: None,
            email_otp_attempts: 0,
            prefs: Preferences::default(),
        }
    }

    /// Google access token, if the user has completed consent.
    pub fn google_access_token(&self) -> Option<&str> {
        self.google
            .as_ref()
            .map(|t| t.access_token.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Whether a usable Notion token is on record.
    pub fn has_notion(&self) -> bool {
        self.notion_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Drops any pending login code.
    pub fn clear_otp(&mut self) {
        self.email_otp = None;
        self.email_otp_expires = None;
        self.email_otp_attempts = 0;
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}
