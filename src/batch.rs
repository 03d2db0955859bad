/// Batch Streaming Module
///
/// Groups consecutive rows from an underlying row stream into pages of a
/// fixed size. Each page is materialized eagerly when yielded (a bounded
/// list, not itself lazy); the outer sequence of pages stays lazy. Query
/// and ordering semantics are those of the wrapped `RowStream`.

use crate::config::ConnectInfo;
use crate::core::{Result, RowflowError};
use crate::query::{Page, Query};
use crate::stream::RowStream;
use tracing::debug;

/// A lazy sequence of fixed-size record groups from one query.
///
/// Every yielded page holds exactly `batch_size` records except possibly
/// the final one, which holds between 1 and `batch_size`. The sequence
/// ends when the underlying stream stops producing rows; an empty fetch is
/// the terminal signal, never an error.
#[derive(Debug)]
pub struct BatchStream {
    rows: RowStream,
    batch_size: usize,
    done: bool,
}

impl BatchStream {
    /// Opens a batched stream over the given query.
    ///
    /// # Errors
    ///
    /// Returns `RowflowError::Config` for a zero batch size, or
    /// `RowflowError::Connection` if the stream's session cannot open.
    pub fn open(info: &ConnectInfo, query: Query, batch_size: usize) -> Result<Self> {
        let rows = RowStream::open(info, query)?;
        Self::from_rows(rows, batch_size)
    }

    /// Wraps an already open row stream.
    pub fn from_rows(rows: RowStream, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(RowflowError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(BatchStream {
            rows,
            batch_size,
            done: false,
        })
    }

    /// The configured page size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Iterator for BatchStream {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut page = Vec::with_capacity(self.batch_size);
        while page.len() < self.batch_size {
            match self.rows.next() {
                Some(Ok(record)) => page.push(record),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => break,
            }
        }

        if page.is_empty() {
            self.done = true;
            None
        } else {
            Some(Ok(page))
        }
    }
}

/// Per-page slice of a batch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records in this page.
    pub rows: usize,
    /// Records whose `column` value exceeded the cutoff.
    pub over_cutoff: usize,
}

/// Aggregated outcome of processing a whole batched sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub batches: Vec<BatchSummary>,
    pub total_rows: usize,
    pub total_over_cutoff: usize,
}

/// Consumes a batched sequence, counting per page how many records carry a
/// `column` value strictly greater than `cutoff`.
///
/// Works over any page source with these semantics, so an
/// `OffsetPaginator` can stand in for a `BatchStream`.
///
/// # Errors
///
/// Propagates the first stream error, or `RowflowError::Decode` if a
/// record lacks a numeric `column`.
pub fn profile_batches(
    pages: impl Iterator<Item = Result<Page>>,
    column: &str,
    cutoff: f64,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for page in pages {
        let page = page?;
        let mut over_cutoff = 0;
        for record in &page {
            if record.numeric(column)? > cutoff {
                over_cutoff += 1;
            }
        }

        debug!(
            "Batch processed: {} rows, {} over cutoff",
            page.len(),
            over_cutoff
        );

        report.total_rows += page.len();
        report.total_over_cutoff += over_cutoff;
        report.batches.push(BatchSummary {
            rows: page.len(),
            over_cutoff,
        });
    }

    Ok(report)
}
