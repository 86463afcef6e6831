//! SQLite access layer.
//!
//! - Connection pooling (r2d2-sqlite) with pragmas applied per connection
//! - Transaction helper with rollback on error
//! - Forward-only schema migrations keyed on `PRAGMA user_version`
//!
//! All access from async code goes through [`Database::with_connection`],
//! which runs the closure on the blocking pool.

pub mod migrations;
pub mod transactions;

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use transactions::execute_in_transaction;

/// Database module result type
pub type Result<T> = std::result::Result<T, DbError>;

/// Database error types
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const FILE_POOL_SIZE: u32 = 8;

const CONNECTION_PRAGMAS: &str = "
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

/// Pooled handle to the store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (creating if needed) the database file at `path` and migrate it.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder().max_size(FILE_POOL_SIZE).build(manager)?;

        {
            let conn = pool.get()?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }

        Self::from_pool(pool)
    }

    /// A private in-memory database. Every pooled connection to `:memory:`
    /// is a separate database, so the pool holds exactly one connection and
    /// never recycles it.
    pub fn open_in_memory() -> Result<Self> {
        let manager =
            SqliteConnectionManager::memory().with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self> {
        let mut conn = pool.get()?;
        migrations::migrate_to_latest(&mut conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    /// Run a synchronous closure against a pooled connection on the
    /// blocking thread pool.
    pub async fn with_connection<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Connection) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(DbError::from)?;
            f(&mut conn)
        })
        .await
        .map_err(DbError::from)?
    }

    /// `SELECT 1` against a pooled connection.
    pub async fn ping(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_is_migrated() {
        let db = Database::open_in_memory().unwrap();
        let version: i32 = db
            .with_connection(|conn| {
                conn.query_row("PRAGMA user_version", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .await
            .unwrap();
        assert_eq!(version, migrations::SCHEMA_VERSION);
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("taskboard.db");

        let db = Database::open(&path).unwrap();
        db.with_connection(|conn| {
            conn.execute("INSERT INTO team_members (id, name) VALUES ('m1', 'Ada')", [])
                .map_err(DbError::from)
        })
        .await
        .unwrap();
        drop(db);

        let db = Database::open(&path).unwrap();
        let name: String = db
            .with_connection(|conn| {
                conn.query_row("SELECT name FROM team_members WHERE id = 'm1'", [], |row| {
                    row.get(0)
                })
                .map_err(DbError::from)
            })
            .await
            .unwrap();
        assert_eq!(name, "Ada");
    }
}
