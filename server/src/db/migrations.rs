//! Schema versioning and migrations.
//!
//! Forward-only. The applied version lives in `PRAGMA user_version`; each
//! step runs in its own transaction together with the version bump.

use rusqlite::{Connection, TransactionBehavior};

use super::{DbError, Result, execute_in_transaction};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const MIGRATIONS: &[(i32, &str)] = &[(1, V1_SCHEMA)];

const V1_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    auto_progress INTEGER NOT NULL DEFAULT 1,
    tags TEXT,
    priority TEXT NOT NULL DEFAULT 'medium',
    deadline TEXT
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    assignee_id TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    description TEXT,
    comments TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS team_members (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
";

/// Apply all migrations newer than the stored version.
pub fn migrate_to_latest(conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema v{current} is newer than supported v{SCHEMA_VERSION}"
        )));
    }

    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            Ok::<_, DbError>(())
        })?;
        tracing::info!("Applied schema migration v{version}");
    }
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}
