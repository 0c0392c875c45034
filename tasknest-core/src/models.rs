use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::{SyncError, SyncResult};

/// A single to-do item.
///
/// Serialized with camelCase keys; this is the shape kept in the device cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
}

impl Task {
    /// Build a fresh, incomplete task from a submitted draft.
    pub fn from_draft(id: String, draft: &TaskDraft, notification_id: Option<String>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            priority: draft.priority,
            due_date: draft.due_date,
            is_completed: false,
            notification_id,
        }
    }

    pub fn has_reminder(&self) -> bool {
        self.notification_id.is_some()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// The stored appearance preference. `System` follows the surrounding
/// environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn resolve(&self, system_is_dark: bool) -> Theme {
        match self {
            ThemeMode::Light => Theme::Light,
            ThemeMode::Dark => Theme::Dark,
            ThemeMode::System if system_is_dark => Theme::Dark,
            ThemeMode::System => Theme::Light,
        }
    }

    /// The explicit mode that flips the theme currently shown.
    pub fn toggled(&self, system_is_dark: bool) -> ThemeMode {
        match self.resolve(system_is_dark) {
            Theme::Dark => ThemeMode::Light,
            Theme::Light => ThemeMode::Dark,
        }
    }
}

/// Colors of the category badge drawn next to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub label: &'static str,
    pub background: &'static str,
    pub text: &'static str,
}

impl Priority {
    /// Category label shown for the priority.
    pub fn category_label(&self) -> &'static str {
        match self {
            Priority::High => "PRIORITY",
            Priority::Medium => "WORK",
            Priority::Low => "PERSONAL",
        }
    }

    pub fn badge(&self, theme: Theme) -> Badge {
        let (background, text) = match (self, theme) {
            (Priority::High, Theme::Light) => ("#FED7AA", "#EA580C"),
            (Priority::High, Theme::Dark) => ("#7C2D12", "#FB923C"),
            (Priority::Medium, Theme::Light) => ("#DBEAFE", "#2563EB"),
            (Priority::Medium, Theme::Dark) => ("#1E3A8A", "#60A5FA"),
            (Priority::Low, Theme::Light) => ("#D1FAE5", "#059669"),
            (Priority::Low, Theme::Dark) => ("#064E3B", "#34D399"),
        };
        Badge {
            label: self.category_label(),
            background,
            text,
        }
    }
}

/// What the task form submits, for both creation and editing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty()
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.is_blank() {
            return Err(SyncError::InvalidTask("title must not be empty".into()));
        }
        Ok(())
    }

    /// Seed a draft from an existing task, as the edit form does.
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task.due_date,
        }
    }

    /// Produce the edited task. Identity, completion and the reminder handle are kept.
    pub fn apply_to(&self, task: &Task) -> SyncResult<Task> {
        self.validate()?;
        Ok(Task {
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            priority: self.priority,
            due_date: self.due_date,
            ..task.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_task() -> Task {
        Task {
            id: "1700000000000".into(),
            title: "Buy milk".into(),
            description: String::new(),
            priority: Priority::Low,
            due_date: None,
            is_completed: false,
            notification_id: None,
        }
    }

    #[test]
    fn test_task_serializes_camel_case_and_omits_absent_fields() {
        let value = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "1700000000000",
                "title": "Buy milk",
                "description": "",
                "priority": "low",
                "isCompleted": false
            })
        );
    }

    #[test]
    fn test_task_reads_cached_json_with_iso_due_date() {
        let raw = r#"[{"id":"42","title":"Dentist","priority":"high",
            "dueDate":"2025-03-04T09:30:00.000Z","isCompleted":true,"notificationId":"n-1"}]"#;
        let tasks: Vec<Task> = serde_json::from_str(raw).unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.description, "");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(
            task.due_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap())
        );
        assert!(task.is_completed);
        assert!(task.has_reminder());
    }

    #[test]
    fn test_priority_labels_and_defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Priority::High.category_label(), "PRIORITY");
        assert_eq!(Priority::Medium.category_label(), "WORK");
        assert_eq!(Priority::Low.category_label(), "PERSONAL");
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::Low.to_string(), "low");

        let badge = Priority::Medium.badge(Theme::Dark);
        assert_eq!(badge.label, "WORK");
        assert_eq!(badge.text, "#60A5FA");
    }

    #[test]
    fn test_theme_mode_resolve_and_toggle() {
        assert_eq!(ThemeMode::default(), ThemeMode::System);
        assert_eq!(ThemeMode::System.resolve(true), Theme::Dark);
        assert_eq!(ThemeMode::System.resolve(false), Theme::Light);
        assert_eq!(ThemeMode::Light.resolve(true), Theme::Light);

        // toggling always lands on an explicit mode
        assert_eq!(ThemeMode::System.toggled(true), ThemeMode::Light);
        assert_eq!(ThemeMode::System.toggled(false), ThemeMode::Dark);
        assert_eq!(ThemeMode::Dark.toggled(false), ThemeMode::Light);

        assert_eq!("dark".parse::<ThemeMode>().unwrap(), ThemeMode::Dark);
        assert_eq!(ThemeMode::System.to_string(), "system");
        assert!("sepia".parse::<ThemeMode>().is_err());
    }

    #[test]
    fn test_draft_validation_rejects_blank_titles() {
        assert!(TaskDraft::new("   ").validate().is_err());
        assert!(TaskDraft::new("").is_blank());
        assert!(TaskDraft::new(" Call mom ").validate().is_ok());
    }

    #[test]
    fn test_draft_apply_keeps_identity_and_reminder() {
        let mut task = sample_task();
        task.is_completed = true;
        task.notification_id = Some("n-7".into());

        let edited = TaskDraft::from_task(&task)
            .description("two litres")
            .priority(Priority::High)
            .apply_to(&task)
            .unwrap();

        assert_eq!(edited.id, task.id);
        assert_eq!(edited.description, "two litres");
        assert_eq!(edited.priority, Priority::High);
        assert!(edited.is_completed);
        assert_eq!(edited.notification_id.as_deref(), Some("n-7"));
    }
}
