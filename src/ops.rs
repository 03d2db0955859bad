/// Composed Operations Module
///
/// Explicit wrapper composition with a fixed, documented order. Each
/// cross-cutting concern is a function taking an operation and returning
/// its result with the same contract, applied outermost to innermost as:
///
/// ```text
/// cache -> retry -> connection scope -> transaction -> raw operation
/// ```
///
/// The cache sits outside everything because a hit must not open a
/// connection at all. Retry sits outside the scope so every attempt gets a
/// fresh connection rather than a reused, possibly broken one. The
/// transaction sits inside the scope because it needs the open connection.
/// Reads skip the transaction layer; writes skip the cache.

use crate::cache::QueryCache;
use crate::connection::ConnectionScope;
use crate::core::Result;
use crate::query::{execute, fetch_all, Query, Record};
use crate::retry::RetryPolicy;
use crate::transaction::transactional;

/// Read through a scoped connection: scope(raw).
pub fn fetch(scope: &ConnectionScope, query: &Query) -> Result<Vec<Record>> {
    scope.run(|conn| fetch_all(conn, query))
}

/// Read with retries, a fresh connection per attempt: retry(scope(raw)).
pub fn fetch_with_retry(
    policy: &RetryPolicy,
    scope: &ConnectionScope,
    query: &Query,
) -> Result<Vec<Record>> {
    policy.run(|| fetch(scope, query))
}

/// Read through the cache: cache(scope(raw)). A hit opens no connection.
pub fn fetch_cached(
    cache: &mut QueryCache,
    scope: &ConnectionScope,
    query: &Query,
) -> Result<Vec<Record>> {
    cache.fetch(query, || fetch(scope, query))
}

/// The full read stack: cache(retry(scope(raw))).
pub fn fetch_cached_with_retry(
    cache: &mut QueryCache,
    policy: &RetryPolicy,
    scope: &ConnectionScope,
    query: &Query,
) -> Result<Vec<Record>> {
    cache.fetch(query, || policy.run(|| fetch(scope, query)))
}

/// Write inside a transaction on a scoped connection: scope(tx(raw)).
pub fn execute_in_transaction(scope: &ConnectionScope, query: &Query) -> Result<usize> {
    scope.run(|conn| transactional(conn, |tx| execute(tx, query)))
}

/// The full write stack: retry(scope(tx(raw))). The wrapped work re-runs
/// from scratch on each attempt, so it must be safe to repeat.
pub fn execute_with_retry(
    policy: &RetryPolicy,
    scope: &ConnectionScope,
    query: &Query,
) -> Result<usize> {
    policy.run(|| execute_in_transaction(scope, query))
}
