//! Classified intent of an inbound message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// The purpose of a user message, as decided by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateEvent,
    GetEvents,
    AddTask,
    GetTasks,
    UpdateTask,
    DeleteTask,
    SetReminder,
    #[default]
    General,
}

impl Intent {
    /// Wire name of the intent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CreateEvent => "create_event",
            Intent::GetEvents => "get_events",
            Intent::AddTask => "add_task",
            Intent::GetTasks => "get_tasks",
            Intent::UpdateTask => "update_task",
            Intent::DeleteTask => "delete_task",
            Intent::SetReminder => "set_reminder",
            Intent::General => "general",
        }
    }

    /// Parses a wire name, mapping anything unknown to `General`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create_event" => Ok(Intent::CreateEvent),
            "get_events" => Ok(Intent::GetEvents),
            "add_task" => Ok(Intent::AddTask),
            "get_tasks" => Ok(Intent::GetTasks),
            "update_task" => Ok(Intent::UpdateTask),
            "delete_task" => Ok(Intent::DeleteTask),
            "set_reminder" => Ok(Intent::SetReminder),
            "general" => Ok(Intent::General),
            other => Err(format!("unknown intent: {}", other)),
        }
    }
}

/// One classification result: produced per message, consumed immediately.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,

    #[serde(default)]
    pub details: Map<String, Value>,

    #[serde(default)]
    pub reply: String,
}

impl IntentResult {
    /// A `general` result carrying only a reply.
    pub fn general(reply: impl Into<String>) -> Self {
        Self {
            intent: Intent::General,
            details: Map::new(),
            reply: reply.into(),
        }
    }

    /// String slot from `details`, trimmed; empty strings count as absent.
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// First present string slot among `keys`.
    pub fn detail_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.detail_str(k))
    }

    /// Object slot from `details`.
    pub fn detail_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.details.get(key).and_then(Value::as_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_roundtrip_names() {
        for intent in [
            Intent::CreateEvent,
            Intent::GetEvents,
            Intent::AddTask,
            Intent::GetTasks,
            Intent::UpdateTask,
            Intent::DeleteTask,
            Intent::SetReminder,
            Intent::General,
        ] {
            assert_eq!(Intent::from_name(intent.as_str()), intent);
        }
    }

    #[test]
    fn test_unknown_intent_is_general() {
        assert_eq!(Intent::from_name("book_flight"), Intent::General);
        assert_eq!(Intent::from_name(" ADD_TASK "), Intent::AddTask);
    }

    #[test]
    fn test_detail_accessors() {
        let mut result = IntentResult::general("ok");
        result.details.insert("title".into(), json!("  finish project "));
        result.details.insert("empty".into(), json!(""));
        result.details.insert("updates".into(), json!({"status": "Done"}));

        assert_eq!(result.detail_str("title"), Some("finish project"));
        assert_eq!(result.detail_str("empty"), None);
        assert_eq!(result.detail_any(&["due_date", "title"]), Some("finish project"));
        assert_eq!(
            result.detail_object("updates").and_then(|u| u.get("status")),
            Some(&json!("Done"))
        );
    }
}
