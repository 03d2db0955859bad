/// Offset Pagination Module
///
/// Produces a lazy sequence of pages by repeated bounded fetches, advancing
/// an offset cursor by the page size after each non-empty page. Every fetch
/// is an independent `LIMIT ? OFFSET ?` query through a fresh connection
/// scope, so a consumer can pause between pages without holding a
/// transaction open.
///
/// Known consistency caveat: rows inserted or deleted between page fetches
/// can cause skipped or duplicated rows across page boundaries. There is no
/// snapshot isolation across pages; callers needing a consistent view must
/// stream instead.

use crate::config::ConnectInfo;
use crate::connection::ConnectionScope;
use crate::core::{Result, RowflowError};
use crate::query::{fetch_all, Page, Query};
use rusqlite::types::Value;
use tracing::debug;

/// A lazy, finite sequence of pages driven by an offset cursor.
///
/// The offset starts at 0 and strictly increases by `page_size` after each
/// yielded page; it never decreases or repeats. An empty fetch is the
/// terminal signal.
#[derive(Debug)]
pub struct OffsetPaginator {
    scope: ConnectionScope,
    query: Query,
    page_size: usize,
    offset: usize,
    done: bool,
}

impl OffsetPaginator {
    /// Creates a paginator over the given base query.
    ///
    /// The base query must not carry its own LIMIT clause; the paginator
    /// appends the bounds itself.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Config` for a zero page size or a base query
    /// that already limits itself.
    pub fn new(info: ConnectInfo, query: Query, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(RowflowError::Config(
                "page_size must be at least 1".to_string(),
            ));
        }
        // Token match rather than substring, so a LIMIT after any
        // whitespace is caught and 'limit' inside a string literal is not.
        let has_limit = query
            .statement()
            .to_uppercase()
            .split_whitespace()
            .any(|token| token == "LIMIT");
        if has_limit {
            return Err(RowflowError::Config(
                "paginated queries must not carry their own LIMIT clause".to_string(),
            ));
        }

        Ok(OffsetPaginator {
            scope: ConnectionScope::new(info),
            query,
            page_size,
            offset: 0,
            done: false,
        })
    }

    /// The configured page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The offset the next fetch will skip to.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn page_query(&self) -> Query {
        let base = self.query.statement().trim_end().trim_end_matches(';');
        let mut params = self.query.params().to_vec();
        params.push(Value::Integer(self.page_size as i64));
        params.push(Value::Integer(self.offset as i64));
        Query::with_params(format!("{} LIMIT ? OFFSET ?", base), params)
    }
}

impl Iterator for OffsetPaginator {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let page_query = self.page_query();
        match self.scope.run(|conn| fetch_all(conn, &page_query)) {
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
            Ok(page) if page.is_empty() => {
                debug!("Pagination exhausted at offset {}", self.offset);
                self.done = true;
                None
            }
            Ok(page) => {
                self.offset += self.page_size;
                Some(Ok(page))
            }
        }
    }
}
