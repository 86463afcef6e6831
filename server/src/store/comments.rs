//! Comments live as a JSON array on their task row. Appends and removals
//! rewrite the whole array inside one `IMMEDIATE` transaction.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use taskboard_protocol::Comment;

use super::rows::{decode_list, encode_list};
use super::{StoreError, StoreResult, new_id};
use crate::db::execute_in_transaction;

fn load(conn: &Connection, project_id: &str, task_id: &str) -> StoreResult<Vec<Comment>> {
    let raw: Option<Option<String>> = conn
        .query_row(
            "SELECT comments FROM tasks WHERE id = ?1 AND project_id = ?2",
            params![task_id, project_id],
            |row| row.get(0),
        )
        .optional()?;
    let raw = raw.ok_or(StoreError::NotFound("task"))?;
    Ok(decode_list(raw.as_deref(), "comments"))
}

fn save(conn: &Connection, task_id: &str, comments: &[Comment]) -> StoreResult<()> {
    conn.execute(
        "UPDATE tasks SET comments = ?1 WHERE id = ?2",
        params![encode_list(comments)?, task_id],
    )?;
    Ok(())
}

/// Append a comment. `text` must already be trimmed and non-empty.
pub fn add(
    conn: &mut Connection,
    project_id: &str,
    task_id: &str,
    text: &str,
    author_id: Option<&str>,
) -> StoreResult<Comment> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let mut comments = load(tx, project_id, task_id)?;
        let comment = Comment {
            id: new_id(),
            text: text.to_string(),
            created_at: Utc::now(),
            author_id: author_id.map(str::to_string),
        };
        comments.push(comment.clone());
        save(tx, task_id, &comments)?;
        Ok(comment)
    })
}

/// Remove a comment by id. Removing an unknown comment is not an error; an
/// unknown task is.
pub fn remove(
    conn: &mut Connection,
    project_id: &str,
    task_id: &str,
    comment_id: &str,
) -> StoreResult<()> {
    execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
        let mut comments = load(tx, project_id, task_id)?;
        let before = comments.len();
        comments.retain(|c| c.id != comment_id);
        if comments.len() != before {
            save(tx, task_id, &comments)?;
        }
        Ok(())
    })
}
