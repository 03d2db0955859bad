/// Concurrent Read Module
///
/// Fans independent read queries out to worker threads, one fresh
/// connection each, and waits for their combined completion before any
/// result is used. Execution order between the reads is unspecified; the
/// returned results are in input order. No connection is ever shared
/// between concurrent operations.

use crate::config::ConnectInfo;
use crate::connection::ConnectionScope;
use crate::core::{Result, RowflowError};
use crate::query::{fetch_all, Query, Record};
use std::thread;
use tracing::debug;

/// Runs every query on its own worker thread against its own connection.
///
/// # Errors
///
/// After all workers have finished, the first failure in input order is
/// returned: the original `Connection`/`Statement` error from its worker,
/// or `RowflowError::Worker` if a worker panicked.
pub fn fetch_concurrently(info: &ConnectInfo, queries: Vec<Query>) -> Result<Vec<Vec<Record>>> {
    debug!("Dispatching {} concurrent reads", queries.len());

    let mut handles = Vec::with_capacity(queries.len());
    let mut spawn_failure = None;
    for (i, query) in queries.into_iter().enumerate() {
        let scope = ConnectionScope::new(info.clone());
        let spawned = thread::Builder::new()
            .name(format!("rowflow-read-{}", i))
            .spawn(move || scope.run(|conn| fetch_all(conn, &query)));
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                // Already-running workers must still be waited for.
                spawn_failure = Some(e);
                break;
            }
        }
    }

    drain_workers(handles, spawn_failure)
}

/// Joins every worker, then reports the first failure in input order. A
/// spawn failure is reported last, after the workers spawned before it
/// have finished cleanly.
fn drain_workers(
    handles: Vec<thread::JoinHandle<Result<Vec<Record>>>>,
    spawn_failure: Option<std::io::Error>,
) -> Result<Vec<Vec<Record>>> {
    // Join everything first; combined completion precedes error handling.
    let joined: Vec<thread::Result<Result<Vec<Record>>>> =
        handles.into_iter().map(|handle| handle.join()).collect();

    let mut results = Vec::with_capacity(joined.len());
    for outcome in joined {
        let result = outcome
            .map_err(|_| RowflowError::Worker("read worker panicked".to_string()))?;
        results.push(result?);
    }
    if let Some(e) = spawn_failure {
        return Err(e.into());
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::execute;
    use rusqlite::types::Value;
    use tempfile::NamedTempFile;

    fn seeded_db() -> (NamedTempFile, ConnectInfo) {
        let file = NamedTempFile::new().unwrap();
        let info = ConnectInfo::with_database(file.path().to_str().unwrap());
        ConnectionScope::new(info.clone())
            .run(|conn| {
                execute(
                    conn,
                    &Query::new("CREATE TABLE user_data (user_id INTEGER PRIMARY KEY, name TEXT, age INTEGER)"),
                )?;
                execute(
                    conn,
                    &Query::new(
                        "INSERT INTO user_data (name, age) VALUES
                         ('Ada', 36), ('Blake', 28), ('Cleo', 45), ('Дани', 22)",
                    ),
                )?;
                Ok(())
            })
            .unwrap();
        (file, info)
    }

    #[test]
    fn test_results_arrive_in_input_order() {
        let (_file, info) = seeded_db();

        let results = fetch_concurrently(
            &info,
            vec![
                Query::new("SELECT * FROM user_data ORDER BY user_id"),
                Query::with_params(
                    "SELECT * FROM user_data WHERE age > ? ORDER BY user_id",
                    vec![Value::Integer(40)],
                ),
            ],
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), 4);
        assert_eq!(results[1].len(), 1);
        assert_eq!(results[1][0].text("name").unwrap(), "Cleo");
    }

    #[test]
    fn test_one_failing_read_surfaces_its_own_error() {
        let (_file, info) = seeded_db();

        let result = fetch_concurrently(
            &info,
            vec![
                Query::new("SELECT * FROM user_data"),
                Query::new("SELECT * FROM missing"),
            ],
        );

        assert!(matches!(result, Err(RowflowError::Statement(_))));
    }

    #[test]
    fn test_no_queries_is_a_no_op() {
        let (_file, info) = seeded_db();
        let results = fetch_concurrently(&info, Vec::new()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_spawn_failure_still_waits_for_running_workers() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use std::time::Duration;

        let completed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let completed = Arc::clone(&completed);
            handles.push(thread::spawn(move || -> Result<Vec<Record>> {
                thread::sleep(Duration::from_millis(50));
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            }));
        }

        let failure = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let result = drain_workers(handles, Some(failure));

        assert!(matches!(result, Err(RowflowError::Io(_))));
        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }
}
