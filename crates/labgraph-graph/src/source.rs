//! The remote fetch primitive.
//!
//! A [`RecordSource`] answers exactly one kind of question: "every row of
//! table T matching criterion C". Pagination, authentication and transport
//! retries all live behind this trait.

use crate::criterion::Criterion;
use crate::row::{Row, Table};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// Source interface
// ============================================================================

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch all rows of `table` matching `criterion`, fully drained.
    async fn fetch(&self, table: &Table, criterion: &Criterion) -> Result<Vec<Row>, SourceError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "record-source"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("record store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// In-memory source
// ============================================================================

/// One issued fetch, as seen by [`MemorySource`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    pub table: Table,
    pub criterion: Criterion,
}

/// Rows held in memory, criteria evaluated locally.
///
/// Every call is appended to a fetch log, which is how round-trip counts are
/// observed in tests and in dry runs against snapshots.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: HashMap<Table, Vec<Row>>,
    log: Mutex<Vec<FetchRecord>>,
    failing: Vec<Table>,
    latency: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut source = Self::new();
        for row in rows {
            source.insert(row);
        }
        source
    }

    pub fn insert(&mut self, row: Row) {
        self.tables.entry(row.table().clone()).or_default().push(row);
    }

    /// Make every fetch against `table` fail with a network error.
    pub fn fail_on(mut self, table: impl Into<Table>) -> Self {
        self.failing.push(table.into());
        self
    }

    /// Delay every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn fetch_log(&self) -> Vec<FetchRecord> {
        self.log.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.log.lock().len()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch(&self, table: &Table, criterion: &Criterion) -> Result<Vec<Row>, SourceError> {
        self.log.lock().push(FetchRecord {
            table: table.clone(),
            criterion: criterion.clone(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.contains(table) {
            return Err(SourceError::Network(format!("{table} unavailable")));
        }

        Ok(self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| criterion.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
