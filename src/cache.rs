/// Result Cache Module
///
/// Memoizes the output of idempotent reads. The cache is an explicit object
/// the caller owns and injects; there is no module-level shared state. Keys
/// are the statement text together with the typed parameters, so two
/// parameterizations of the same statement never collide, not even across
/// types that render alike (`Integer(1)` versus `Text("1")`).
///
/// The cache lives as long as its owner, grows without bound (no eviction)
/// and is not internally synchronized; wrap it in a `Mutex` when sharing
/// across threads. Only successful results are stored, and only read-only,
/// side-effect-free queries are safe to cache.

use crate::core::Result;
use crate::query::{Query, Record};
use rusqlite::types::Value;
use std::collections::HashMap;
use std::fmt::Write;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    statement: String,
    params: Vec<String>,
}

impl CacheKey {
    fn for_query(query: &Query) -> Self {
        CacheKey {
            statement: query.statement().to_string(),
            params: query.params().iter().map(key_param).collect(),
        }
    }
}

/// Encodes one parameter for keying, tagged with its type so values that
/// render identically stay distinct. Reals key on their bit pattern.
fn key_param(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(i) => format!("i:{}", i),
        Value::Real(f) => format!("r:{:x}", f.to_bits()),
        Value::Text(t) => format!("t:{}", t),
        Value::Blob(b) => {
            let mut key = String::with_capacity(2 + b.len() * 2);
            key.push_str("b:");
            for byte in b {
                let _ = write!(key, "{:02x}", byte);
            }
            key
        }
    }
}

/// Query-keyed memoization of read results.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<CacheKey, Vec<Record>>,
}

impl QueryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        QueryCache::default()
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached result for `query`, or invokes `op` and stores
    /// its output.
    ///
    /// On a hit, `op` is not invoked at all — in the usual composition that
    /// means no connection is opened. On a miss, a failing `op` leaves the
    /// cache untouched, so the next call re-executes.
    pub fn fetch(
        &mut self,
        query: &Query,
        op: impl FnOnce() -> Result<Vec<Record>>,
    ) -> Result<Vec<Record>> {
        if !query.is_read_only() {
            warn!("Caching a non-read statement: {}", query.statement());
        }

        let key = CacheKey::for_query(query);
        if let Some(hit) = self.entries.get(&key) {
            debug!("Using cached result for: {}", query.statement());
            return Ok(hit.clone());
        }

        let rows = op()?;
        self.entries.insert(key, rows.clone());
        Ok(rows)
    }
}
