//! Type-safe ID wrappers for Anvik.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Implements the shared string-newtype surface for an ID type.
macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Opaque chat identity handed to us by the transport.
///
/// Telegram chat ids are integers; they are kept as strings so the store
/// and the OAuth `state` parameter never have to care about the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl_id!(ChatId);

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl ChatId {
    /// Numeric form of the id, for transports that address chats by integer.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

/// Identifier of a scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(String);

impl_id!(ReminderId);

impl ReminderId {
    /// Creates a new random ID.
    pub fn new() -> Self {
        Self(format!("rem-{}", Uuid::new_v4()))
    }
}

impl Default for ReminderId {
    fn default() -> Self {
        Self::new()
    }
}
