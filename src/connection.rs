/// Connection Scope Module
///
/// This module provides scoped connection acquisition: one connection per
/// operation, opened from caller-supplied coordinates and released on every
/// exit path. Nothing here retries; a composed `RetryPolicy` sits above the
/// scope so each attempt gets a fresh connection.

use crate::config::ConnectInfo;
use crate::core::{Result, RowflowError};
use rusqlite::Connection;
use tracing::{debug, warn};

/// Acquires a database connection for the duration of one operation.
///
/// The wrapped operation receives exclusive access to the connection; the
/// scope closes it after the operation returns, whether it succeeded or
/// failed. The connection is never read from after release.
#[derive(Debug, Clone)]
pub struct ConnectionScope {
    info: ConnectInfo,
}

impl ConnectionScope {
    /// Creates a scope over the given backend coordinates.
    pub fn new(info: ConnectInfo) -> Self {
        ConnectionScope { info }
    }

    /// The coordinates this scope connects with.
    pub fn info(&self) -> &ConnectInfo {
        &self.info
    }

    /// Opens a connection from the given coordinates.
    ///
    /// Shared with the streaming and fan-out workers, which manage their
    /// own connection lifetime instead of running inside `run`.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Connection` if the backend is unreachable or
    /// rejects the coordinates. Not retried at this layer.
    pub(crate) fn open(info: &ConnectInfo) -> Result<Connection> {
        debug!(
            "Opening database connection to {}:{}/{}",
            info.host, info.port, info.database
        );
        let conn = Connection::open(&info.database).map_err(RowflowError::Connection)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(RowflowError::Connection)?;
        Ok(conn)
    }

    /// Runs one operation against a freshly opened connection.
    ///
    /// On normal completion the operation's result is returned and the
    /// connection is closed. On an error from the operation the connection
    /// is still closed before the error propagates, unchanged. Exactly one
    /// session is established and torn down per invocation.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Connection` if the session cannot be opened,
    /// or, on an otherwise successful operation, if it cannot be cleanly
    /// closed. Operation errors pass through untouched.
    pub fn run<T>(&self, op: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = Self::open(&self.info)?;

        let result = op(&mut conn);

        match conn.close() {
            Ok(()) => debug!("Database connection closed"),
            Err((_, e)) => {
                // The operation's own error always wins over a teardown
                // failure.
                warn!("Failed to close database connection: {}", e);
                if result.is_ok() {
                    return Err(RowflowError::Connection(e));
                }
            }
        }

        result
    }
}
