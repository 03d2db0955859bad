/// Rowflow Error Module
///
/// This module defines the error types for the rowflow access layer.
/// Failures always carry the original backend error as their source so
/// callers see the real cause after cleanup, never a generic wrapper.
use thiserror::Error;

/// Error type covering every failure the access layer can surface.
///
/// There is deliberately no `#[from] rusqlite::Error` conversion: whether a
/// backend error counts as a connection failure or a statement failure
/// depends on the call site, so each site classifies explicitly.
#[derive(Error, Debug)]
pub enum RowflowError {
    /// Backend unreachable, rejected credentials, or failed to tear down
    #[error("Connection error: {0}")]
    Connection(#[source] rusqlite::Error),

    /// Malformed statement, constraint violation, or mid-query failure
    #[error("Statement error: {0}")]
    Statement(#[source] rusqlite::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A row value could not be read in the shape the caller asked for
    #[error("Row decode error: {0}")]
    Decode(String),

    /// File system and I/O errors (config files, thread spawning)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A streaming or fan-out worker thread died without reporting
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Type alias for Result to use RowflowError as the error type.
pub type Result<T> = std::result::Result<T, RowflowError>;
