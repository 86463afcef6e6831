//! Persistence for the taskboard entities.
//!
//! Every function here is synchronous and takes a borrowed connection; the
//! HTTP layer runs them through [`crate::db::Database::with_connection`].
//! Writes that can move a project's progress (task create/update/delete,
//! project update) commit the row change and the recompute together in one
//! `IMMEDIATE` transaction.

pub mod comments;
pub mod projects;
pub mod rows;
pub mod tasks;
pub mod team;
pub mod users;

use rusqlite::{Connection, OptionalExtension, params};
use taskboard_protocol::auto_progress;

use crate::db::DbError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email already registered")]
    DuplicateEmail,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Db(DbError::Sqlite(err))
    }
}

/// Re-derive `progress` for `project_id` from its tasks, but only when the
/// project has auto-progress on. Missing projects are ignored.
pub fn recompute_progress_if_auto(conn: &Connection, project_id: &str) -> rusqlite::Result<()> {
    let auto: Option<bool> = conn
        .query_row(
            "SELECT auto_progress FROM projects WHERE id = ?1",
            params![project_id],
            |row| row.get(0),
        )
        .optional()?;
    if auto != Some(true) {
        return Ok(());
    }

    let (total, completed): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks WHERE project_id = ?1",
        params![project_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let progress = auto_progress(
        usize::try_from(completed).unwrap_or(0),
        usize::try_from(total).unwrap_or(0),
    );
    conn.execute(
        "UPDATE projects SET progress = ?1 WHERE id = ?2",
        params![progress, project_id],
    )?;
    Ok(())
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
