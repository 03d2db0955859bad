// Core infrastructure modules
pub mod core;

// Wrapper primitives: scoped connections, transactions, retry, caching
pub mod cache;
pub mod config;
pub mod connection;
pub mod ops;
pub mod retry;
pub mod transaction;

// Query execution and lazy result sequences
pub mod batch;
pub mod concurrent;
pub mod paginate;
pub mod query;
pub mod stats;
pub mod stream;

// Example schema and sample data
pub mod seed;
