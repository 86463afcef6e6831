//! Row mappers. Stored values are coerced rather than rejected: unknown
//! enum strings fall back to their defaults and undecodable JSON columns
//! read as empty lists.

use rusqlite::Row;
use serde::de::DeserializeOwned;
use taskboard_protocol::entities::parse_deadline;
use taskboard_protocol::{Priority, Project, Task, TaskStatus, TeamMember};

pub const PROJECT_COLUMNS: &str = "id, name, progress, auto_progress, tags, priority, deadline";

pub const TASK_COLUMNS: &str =
    "id, project_id, name, completed, assignee_id, status, description, comments";

pub fn project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let progress: i64 = row.get("progress")?;
    let tags: Option<String> = row.get("tags")?;
    let priority: Option<String> = row.get("priority")?;
    let deadline: Option<String> = row.get("deadline")?;
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        progress: progress.clamp(0, 100) as u8,
        auto_progress: row.get("auto_progress")?,
        tags: decode_list(tags.as_deref(), "tags"),
        priority: priority.as_deref().map(Priority::coerce).unwrap_or_default(),
        deadline: deadline.as_deref().and_then(parse_deadline),
        tasks: Vec::new(),
    })
}

pub fn task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: Option<String> = row.get("status")?;
    let comments: Option<String> = row.get("comments")?;
    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        completed: row.get("completed")?,
        project_id: row.get("project_id")?,
        assignee_id: row.get("assignee_id")?,
        status: status.as_deref().map(TaskStatus::coerce).unwrap_or_default(),
        description: row.get("description")?,
        comments: decode_list(comments.as_deref(), "comments"),
    })
}

pub fn member(row: &Row<'_>) -> rusqlite::Result<TeamMember> {
    Ok(TeamMember {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}

pub fn decode_list<T: DeserializeOwned>(raw: Option<&str>, column: &str) -> Vec<T> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!("Ignoring undecodable {column} column: {err}");
            Vec::new()
        }
    }
}

pub fn encode_list<T: serde::Serialize>(items: &[T]) -> rusqlite::Result<String> {
    serde_json::to_string(items).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
