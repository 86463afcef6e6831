//! Domain entities as they appear on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::auto_progress;

/// Project priority. Unknown values coerce to `Medium`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        Priority::coerce(&raw)
    }
}

/// Work status of a task, independent of completion. Unknown values coerce to `Active`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TaskStatus {
    Draft,
    Version,
    #[default]
    Active,
}

impl TaskStatus {
    pub fn coerce(raw: &str) -> Self {
        match raw {
            "draft" => TaskStatus::Draft,
            "version" => TaskStatus::Version,
            "active" => TaskStatus::Active,
            _ => TaskStatus::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Version => "version",
            TaskStatus::Active => "active",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        TaskStatus::coerce(&raw)
    }
}

/// A comment embedded in its task. Insertion order is display order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub completed: bool,
    pub project_id: String,
    /// Weak reference to a `TeamMember`; may dangle after the member is deleted.
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Completion percentage, `0..=100`.
    pub progress: u8,
    /// When set, `progress` mirrors the task completion ratio.
    pub auto_progress: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Project {
    /// Re-derive `progress` from `tasks` when auto-progress is on.
    pub fn recompute_progress(&mut self) {
        if self.auto_progress {
            let done = self.tasks.iter().filter(|t| t.completed).count();
            self.progress = auto_progress(done, self.tasks.len());
        }
    }

    pub fn status(&self) -> ProjectStatus {
        ProjectStatus::of(self.progress, !self.tasks.is_empty())
    }
}

/// Derived project lifecycle state. Never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn of(progress: u8, has_tasks: bool) -> Self {
        if progress >= 100 {
            ProjectStatus::Completed
        } else if has_tasks || progress > 0 {
            ProjectStatus::InProgress
        } else {
            ProjectStatus::NotStarted
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ProjectStatus::NotStarted => "Not Started",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
}

/// The user projection returned by the auth endpoints (never the password hash).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Parse a deadline as `YYYY-MM-DD` or the calendar date of an RFC 3339 timestamp.
pub fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc).date_naive())
}
