//! Row shapes of the hosted `tasks` table.
//!
//! The table uses snake_case columns (`due_date`, `is_completed`,
//! `notification_id`, `user_id`, `created_at`); the domain [`Task`] uses
//! camelCase when serialized. These types are the only place the two meet.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::models::{Priority, Task};

/// A row as returned by the remote table.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub notification_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskRow {
    pub fn into_task(self) -> Task {
        let priority = self
            .priority
            .as_deref()
            .and_then(|p| p.parse::<Priority>().ok())
            .unwrap_or_default();
        Task {
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            priority,
            due_date: self.due_date,
            is_completed: self.is_completed.unwrap_or(false),
            notification_id: self.notification_id,
        }
    }
}

/// Insert payload. `id` and `created_at` are assigned by the server.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewTaskRow {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    pub user_id: String,
}

impl NewTaskRow {
    pub fn from_task(task: &Task, user_id: &str) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
            is_completed: task.is_completed,
            notification_id: task.notification_id.clone(),
            user_id: user_id.to_string(),
        }
    }
}

/// Update payload. Absent fields are left untouched by the server; the
/// nested options let a field be cleared explicitly with `null`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<Option<String>>,
}

impl TaskPatch {
    /// Every field except `id`.
    pub fn full(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            priority: Some(task.priority),
            due_date: Some(task.due_date),
            is_completed: Some(task.is_completed),
            notification_id: Some(task.notification_id.clone()),
        }
    }

    /// Completion flag only, plus a `null` reminder handle when one was canceled.
    pub fn completion(is_completed: bool, cleared_notification: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            notification_id: cleared_notification.then_some(None),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("unsupported id value: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_maps_columns_to_task_fields() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": 17,
            "title": "Water plants",
            "description": null,
            "priority": "high",
            "due_date": "2025-06-01T18:15:00+00:00",
            "is_completed": false,
            "notification_id": "abc",
            "user_id": "u-1",
            "created_at": "2025-05-30T08:00:00.123456+00:00"
        }))
        .unwrap();

        let task = row.into_task();
        assert_eq!(task.id, "17");
        assert_eq!(task.description, "");
        assert_eq!(task.priority, Priority::High);
        assert!(task.due_date.is_some());
        assert_eq!(task.notification_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_row_tolerates_unknown_priority_and_missing_flags() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "6f1c",
            "title": "Stretch",
            "priority": "urgent"
        }))
        .unwrap();
        let task = row.into_task();
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.is_completed);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_insert_payload_uses_snake_case_and_omits_id() {
        let task = Task {
            id: "local".into(),
            title: "Pay rent".into(),
            description: "before the 5th".into(),
            priority: Priority::High,
            due_date: None,
            is_completed: false,
            notification_id: None,
        };
        let value = serde_json::to_value(NewTaskRow::from_task(&task, "user-9")).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "Pay rent",
                "description": "before the 5th",
                "priority": "high",
                "is_completed": false,
                "user_id": "user-9"
            })
        );
    }

    #[test]
    fn test_full_patch_clears_due_date_with_null() {
        let task = Task {
            id: "1".into(),
            title: "Read".into(),
            description: String::new(),
            priority: Priority::Low,
            due_date: None,
            is_completed: true,
            notification_id: None,
        };
        let value = serde_json::to_value(TaskPatch::full(&task)).unwrap();
        assert_eq!(value["due_date"], serde_json::Value::Null);
        assert_eq!(value["notification_id"], serde_json::Value::Null);
        assert_eq!(value["is_completed"], json!(true));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_completion_patch_only_touches_flag() {
        let value = serde_json::to_value(TaskPatch::completion(true, false)).unwrap();
        assert_eq!(value, json!({ "is_completed": true }));

        let value = serde_json::to_value(TaskPatch::completion(true, true)).unwrap();
        assert_eq!(value, json!({ "is_completed": true, "notification_id": null }));

        assert!(TaskPatch::default().is_empty());
    }
}
