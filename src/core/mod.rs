/// Core Module for rowflow
///
/// Shared infrastructure for the access layer: the crate-wide error type
/// and Result alias used by every component.

pub mod error;

// Re-export commonly used types for convenience
pub use error::{Result, RowflowError};
