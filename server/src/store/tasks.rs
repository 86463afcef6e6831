use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use taskboard_protocol::requests::{CreateTask, UpdateTask};
use taskboard_protocol::{DEFAULT_TASK_NAME, Task, normalize_name};

use super::rows::{self, TASK_COLUMNS};
use super::{StoreError, StoreResult, new_id, recompute_progress_if_auto};
use crate::db::execute_in_transaction;

/// Tasks of one project, newest first. Unknown projects have no tasks.
pub fn list(conn: &Connection, project_id: &str) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY rowid DESC"
    ))?;
    let tasks = stmt
        .query_map(params![project_id], rows::task)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// A task, only if it belongs to `project_id`.
pub fn find(conn: &Connection, project_id: &str, task_id: &str) -> rusqlite::Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND project_id = ?2"),
        params![task_id, project_id],
        rows::task,
    )
    .optional()
}

pub fn create(conn: &mut Connection, project_id: &str, req: &CreateTask) -> StoreResult<Task> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound("project"));
        }

        let id = new_id();
        tx.execute(
            "INSERT INTO tasks (id, project_id, name, completed, assignee_id, status, description, comments, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, '[]', ?7)",
            params![
                id,
                project_id,
                normalize_name(req.name.as_deref(), DEFAULT_TASK_NAME),
                req.assignee_id.as_deref().filter(|s| !s.is_empty()),
                req.status.unwrap_or_default().as_str(),
                non_empty(req.description.as_deref()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        recompute_progress_if_auto(tx, project_id)?;
        find(tx, project_id, &id)?.ok_or(StoreError::NotFound("task"))
    })
}

pub fn update(
    conn: &mut Connection,
    project_id: &str,
    task_id: &str,
    req: &UpdateTask,
) -> StoreResult<Task> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let mut task = find(tx, project_id, task_id)?.ok_or(StoreError::NotFound("task"))?;

        if let Some(name) = req.name.as_deref() {
            task.name = normalize_name(Some(name), DEFAULT_TASK_NAME);
        }
        if let Some(completed) = req.completed {
            task.completed = completed;
        }
        if let Some(assignee) = &req.assignee_id {
            task.assignee_id = assignee.clone().filter(|s| !s.is_empty());
        }
        if let Some(status) = req.status {
            task.status = status;
        }
        if let Some(description) = &req.description {
            task.description = non_empty(description.as_deref()).map(str::to_string);
        }

        tx.execute(
            "UPDATE tasks
             SET name = ?1, completed = ?2, assignee_id = ?3, status = ?4, description = ?5
             WHERE id = ?6",
            params![
                task.name,
                task.completed,
                task.assignee_id,
                task.status.as_str(),
                task.description,
                task_id,
            ],
        )?;
        recompute_progress_if_auto(tx, project_id)?;
        Ok(task)
    })
}

/// Delete a task from a project. Deleting a missing task is not an error.
pub fn delete(conn: &mut Connection, project_id: &str, task_id: &str) -> StoreResult<()> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        tx.execute(
            "DELETE FROM tasks WHERE id = ?1 AND project_id = ?2",
            params![task_id, project_id],
        )?;
        recompute_progress_if_auto(tx, project_id)?;
        Ok(())
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
