/// Row Streaming Module
///
/// Produces query results as a lazy, finite sequence of records without
/// materializing the full result set. A worker thread owns its own
/// connection and steps the prepared statement row by row; a bounded
/// channel between worker and consumer keeps memory at O(chunk) regardless
/// of table size.
///
/// A stream is not restartable: a fresh `open` re-runs the query from the
/// start, the same stream cannot be rewound. Rows arrive in whatever order
/// the statement's ORDER BY clause declares; without one the backend's scan
/// order is unspecified and callers must not depend on it.

use crate::config::ConnectInfo;
use crate::connection::ConnectionScope;
use crate::core::{Result, RowflowError};
use crate::query::{Query, Record};
use rusqlite::{params_from_iter, Connection};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Rows buffered between the worker and the consumer. An internal
/// performance knob, not part of the observable contract.
pub const DEFAULT_FETCH_CHUNK: usize = 256;

/// A lazy, finite stream of records from one query.
///
/// Iterates as `Result<Record>`: a backend failure mid-stream surfaces at
/// the next requested element, after which the stream is exhausted. The
/// worker's connection is released on exhaustion, on error, and on early
/// drop alike.
///
/// The worker opens its own session from the given coordinates, so the
/// coordinates must name a shared database (a file path; a plain
/// `:memory:` database is private to its connection).
#[derive(Debug)]
pub struct RowStream {
    rx: Option<Receiver<Result<Record>>>,
    worker: Option<JoinHandle<()>>,
    done: bool,
}

impl RowStream {
    /// Opens a stream with the default buffer size.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Connection` if the session cannot be opened;
    /// statement errors surface lazily through the iterator.
    pub fn open(info: &ConnectInfo, query: Query) -> Result<Self> {
        Self::open_with_chunk(info, query, DEFAULT_FETCH_CHUNK)
    }

    /// Opens a stream buffering up to `fetch_chunk` rows ahead of the
    /// consumer.
    pub fn open_with_chunk(info: &ConnectInfo, query: Query, fetch_chunk: usize) -> Result<Self> {
        if fetch_chunk == 0 {
            return Err(RowflowError::Config(
                "fetch_chunk must be at least 1".to_string(),
            ));
        }

        let conn = ConnectionScope::open(info)?;
        let (tx, rx) = mpsc::sync_channel(fetch_chunk);
        let worker = thread::Builder::new()
            .name("rowflow-stream".to_string())
            .spawn(move || stream_rows(conn, query, tx))?;

        Ok(RowStream {
            rx: Some(rx),
            worker: Some(worker),
            done: false,
        })
    }

    fn reap_worker(&mut self) {
        // Dropping the receiver first unblocks a worker waiting on a full
        // channel; it then exits and releases its connection.
        self.rx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Iterator for RowStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let received = match &self.rx {
            Some(rx) => rx.recv(),
            None => return None,
        };

        match received {
            Ok(Ok(record)) => Some(Ok(record)),
            Ok(Err(e)) => {
                self.done = true;
                self.reap_worker();
                Some(Err(e))
            }
            // Disconnected with the buffer drained: the worker finished.
            Err(_) => {
                self.done = true;
                self.reap_worker();
                None
            }
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        self.reap_worker();
    }
}

fn stream_rows(conn: Connection, query: Query, tx: SyncSender<Result<Record>>) {
    match pump_rows(&conn, &query, &tx) {
        Ok(()) => debug!("Row stream finished: {}", query.statement()),
        Err(e) => {
            error!("Row stream failed: {}", e);
            let _ = tx.send(Err(e));
        }
    }
    // conn drops here, closing the worker's session.
}

fn pump_rows(conn: &Connection, query: &Query, tx: &SyncSender<Result<Record>>) -> Result<()> {
    debug!("Executing query: {}", query.statement());

    let mut stmt = conn
        .prepare(query.statement())
        .map_err(RowflowError::Statement)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt
        .query(params_from_iter(query.params().iter()))
        .map_err(RowflowError::Statement)?;

    loop {
        match rows.next() {
            Ok(Some(row)) => {
                let record = Record::from_row(&columns, row).map_err(RowflowError::Statement)?;
                if tx.send(Ok(record)).is_err() {
                    // Consumer dropped the stream; stop quietly.
                    return Ok(());
                }
            }
            Ok(None) => return Ok(()),
            Err(e) => return Err(RowflowError::Statement(e)),
        }
    }
}
