/// Transaction Wrapper Module
///
/// Wraps an operation in commit/rollback semantics keyed to its outcome:
/// return `Ok` and the transaction commits, return `Err` and it rolls back
/// with the original error re-raised unchanged. Exactly one commit-or-
/// rollback decision happens per invocation.
///
/// Re-invoking after a rollback re-executes the operation from scratch, so
/// wrapped work must be safe to repeat (no side effects outside the
/// transaction).

use crate::core::{Result, RowflowError};
use rusqlite::Connection;
use tracing::{debug, warn};

/// Runs `op` inside a transaction on the given connection.
///
/// Composes with `ConnectionScope::run`, which supplies the open
/// connection.
///
/// # Errors
///
/// Returns `RowflowError::Statement` if the transaction cannot begin or
/// commit; any error from the operation itself passes through untouched
/// after rollback.
pub fn transactional<T>(
    conn: &mut Connection,
    op: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction().map_err(RowflowError::Statement)?;

    match op(&tx) {
        Ok(value) => {
            tx.commit().map_err(RowflowError::Statement)?;
            debug!("Transaction committed");
            Ok(value)
        }
        Err(e) => {
            // The operation's error is what the caller must see; a rollback
            // failure is logged, not raised over it.
            if let Err(rollback_err) = tx.rollback() {
                warn!("Rollback failed: {}", rollback_err);
            } else {
                debug!("Transaction rolled back");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{execute, fetch_all, Query};
    use rusqlite::Connection;

    fn setup(conn: &Connection) {
        conn.execute_batch(
            "CREATE TABLE accounts (id INTEGER PRIMARY KEY, balance INTEGER NOT NULL);
             INSERT INTO accounts (balance) VALUES (100);",
        )
        .unwrap();
    }

    fn balance(conn: &Connection) -> f64 {
        let rows = fetch_all(conn, &Query::new("SELECT balance FROM accounts WHERE id = 1")).unwrap();
        rows[0].numeric("balance").unwrap()
    }

    #[test]
    fn test_commit_on_success() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup(&conn);

        transactional(&mut conn, |tx| {
            execute(tx, &Query::new("UPDATE accounts SET balance = 150 WHERE id = 1"))?;
            Ok(())
        })
        .unwrap();

        assert_eq!(balance(&conn), 150.0);
    }

    #[test]
    fn test_rollback_on_failure() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup(&conn);

        let result: Result<()> = transactional(&mut conn, |tx| {
            execute(tx, &Query::new("UPDATE accounts SET balance = 0 WHERE id = 1"))?;
            // Failure after a write: the write must not survive.
            fetch_all(tx, &Query::new("SELECT * FROM missing"))?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(balance(&conn), 100.0);
    }

    #[test]
    fn test_original_error_survives_rollback() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup(&conn);

        let result: Result<()> = transactional(&mut conn, |tx| {
            execute(tx, &Query::new("INSERT INTO accounts (id, balance) VALUES (1, 5)"))
                .map(|_| ())
        });

        match result.unwrap_err() {
            RowflowError::Statement(e) => {
                assert!(e.to_string().to_lowercase().contains("unique"))
            }
            other => panic!("Expected the original Statement error, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_work_is_atomic() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup(&conn);

        let _ = transactional(&mut conn, |tx| {
            execute(tx, &Query::new("INSERT INTO accounts (balance) VALUES (1)"))?;
            execute(tx, &Query::new("INSERT INTO accounts (balance) VALUES (2)"))?;
            execute(tx, &Query::new("INSERT INTO broken VALUES (3)")).map(|_| ())
        });

        let rows = fetch_all(&conn, &Query::new("SELECT * FROM accounts")).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
