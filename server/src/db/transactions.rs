//! Transaction helper.

use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Execute `operation` inside a transaction.
///
/// Commits when the closure returns `Ok`; on `Err` the transaction is
/// dropped, which rolls it back. Writers should pass
/// [`TransactionBehavior::Immediate`] so the write lock is taken up front
/// instead of on the first write.
///
/// ```rust,no_run
/// # use taskboard_server::db::execute_in_transaction;
/// # use rusqlite::{Connection, TransactionBehavior};
/// # fn example(conn: &mut Connection) -> rusqlite::Result<()> {
/// execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
///     tx.execute("UPDATE projects SET progress = 0", [])?;
///     Ok::<(), rusqlite::Error>(())
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn execute_in_transaction<F, T, E>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    operation: F,
) -> Result<T, E>
where
    F: FnOnce(&Transaction) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    let result = operation(&tx)?;
    tx.commit()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER NOT NULL)")
            .unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn commits_on_success() {
        let mut conn = setup();
        let n: rusqlite::Result<usize> =
            execute_in_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
                tx.execute("INSERT INTO t (v) VALUES (1)", [])
            });
        assert_eq!(n.unwrap(), 1);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn rolls_back_on_error() {
        let mut conn = setup();
        let result: rusqlite::Result<()> =
            execute_in_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
                tx.execute("INSERT INTO t (v) VALUES (1)", [])?;
                tx.execute("INSERT INTO t (v) VALUES (NULL)", [])?;
                Ok(())
            });
        assert!(result.is_err());
        assert_eq!(count(&conn), 0);
    }
}
