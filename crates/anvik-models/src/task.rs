//! Task types backing the Notion integration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow state of a task, mirrored by the Status select in Notion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To-Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// All states, in board order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done];

    /// Name of the select option.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To-Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Lenient parse of user or model supplied status text.
    pub fn parse_loose(s: &str) -> Option<Self> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match norm.as_str() {
            "todo" | "pending" | "open" | "notstarted" => Some(TaskStatus::ToDo),
            "inprogress" | "doing" | "started" | "wip" => Some(TaskStatus::InProgress),
            "done" | "complete" | "completed" | "finished" | "closed" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row to insert into the task database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
}

/// A task as read back from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub due_date: Option<String>,
    pub status: Option<String>,
}

/// Partial update; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdates {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

impl TaskUpdates {
    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_loose_parse() {
        assert_eq!(TaskStatus::parse_loose("Done"), Some(TaskStatus::Done));
        assert_eq!(TaskStatus::parse_loose("to-do"), Some(TaskStatus::ToDo));
        assert_eq!(TaskStatus::parse_loose("In progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse_loose("blocked"), None);
    }

    #[test]
    fn test_status_serializes_as_option_name() {
        let json = serde_json::to_string(&TaskStatus::ToDo).unwrap();
        assert_eq!(json, "\"To-Do\"");
    }

    #[test]
    fn test_updates_is_empty() {
        assert!(TaskUpdates::default().is_empty());
        let updates = TaskUpdates {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert!(!updates.is_empty());
    }
}
