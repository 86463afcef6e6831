use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use taskboard_protocol::entities::parse_deadline;
use taskboard_protocol::requests::{CreateProject, UpdateProject};
use taskboard_protocol::{DEFAULT_PROJECT_NAME, Project, clamp_progress, normalize_name};

use super::rows::{self, PROJECT_COLUMNS, encode_list};
use super::{StoreError, StoreResult, new_id, recompute_progress_if_auto, tasks};
use crate::db::execute_in_transaction;

/// All projects ordered by name, without their tasks.
pub fn list(conn: &Connection) -> StoreResult<Vec<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name ASC"
    ))?;
    let projects = stmt
        .query_map([], rows::project)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(projects)
}

pub fn find(conn: &Connection, id: &str) -> rusqlite::Result<Option<Project>> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
        params![id],
        rows::project,
    )
    .optional()
}

/// A project together with its tasks, newest task first.
pub fn with_tasks(conn: &Connection, id: &str) -> StoreResult<Project> {
    let mut project = find(conn, id)?.ok_or(StoreError::NotFound("project"))?;
    project.tasks = tasks::list(conn, id)?;
    Ok(project)
}

/// Create a project. Auto-progress starts on and progress at 0.
pub fn create(conn: &Connection, req: &CreateProject) -> StoreResult<Project> {
    let id = new_id();
    let name = normalize_name(req.name.as_deref(), DEFAULT_PROJECT_NAME);
    let tags = req.tags.as_deref().map(encode_list).transpose()?;
    let priority = req.priority.unwrap_or_default();
    let deadline = req
        .deadline
        .as_deref()
        .and_then(parse_deadline)
        .map(|d| d.to_string());

    conn.execute(
        "INSERT INTO projects (id, name, progress, auto_progress, tags, priority, deadline)
         VALUES (?1, ?2, 0, 1, ?3, ?4, ?5)",
        params![id, name, tags, priority.as_str(), deadline],
    )?;
    with_tasks(conn, &id)
}

/// Apply a partial update, then recompute progress if auto-progress is on
/// (which overrides any `progress` sent in the same request).
pub fn update(conn: &mut Connection, id: &str, req: &UpdateProject) -> StoreResult<Project> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let mut project = find(tx, id)?.ok_or(StoreError::NotFound("project"))?;

        if let Some(name) = req.name.as_deref() {
            project.name = normalize_name(Some(name), DEFAULT_PROJECT_NAME);
        }
        if let Some(progress) = req.progress {
            project.progress = clamp_progress(progress);
        }
        if let Some(auto) = req.auto_progress {
            project.auto_progress = auto;
        }
        if let Some(priority) = req.priority {
            project.priority = priority;
        }
        if let Some(deadline) = &req.deadline {
            project.deadline = deadline.as_deref().and_then(parse_deadline);
        }
        let tags = match &req.tags {
            None => Some(encode_list(&project.tags)?),
            Some(tags) => tags.as_deref().map(encode_list).transpose()?,
        };

        tx.execute(
            "UPDATE projects
             SET name = ?1, progress = ?2, auto_progress = ?3, tags = ?4, priority = ?5, deadline = ?6
             WHERE id = ?7",
            params![
                project.name,
                project.progress,
                project.auto_progress,
                tags,
                project.priority.as_str(),
                project.deadline.map(|d| d.to_string()),
                id,
            ],
        )?;
        recompute_progress_if_auto(tx, id)?;
        with_tasks(tx, id)
    })
}

/// Delete a project and its tasks. Deleting a missing project is not an error.
pub fn delete(conn: &mut Connection, id: &str) -> StoreResult<()> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        tx.execute("DELETE FROM tasks WHERE project_id = ?1", params![id])?;
        tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(())
    })
}
