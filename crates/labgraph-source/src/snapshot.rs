//! Offline record store backed by a JSON snapshot file.

use crate::wire::{EntityPage, WireEntity};
use async_trait::async_trait;
use labgraph_graph::{Criterion, MemorySource, RecordSource, Row, SourceError, Table};
use std::path::Path;

/// A snapshot file (`{"entities": [...]}`) loaded into memory. Criteria are
/// evaluated locally, so queries behave like the live store minus the
/// network.
#[derive(Debug)]
pub struct SnapshotSource {
    inner: MemorySource,
}

impl SnapshotSource {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, SourceError> {
        let page: EntityPage = serde_json::from_str(contents)
            .map_err(|e| SourceError::InvalidResponse(format!("snapshot: {e}")))?;
        let inner = MemorySource::from_rows(page.into_rows());
        tracing::debug!(rows = inner.row_count(), "loaded snapshot");
        Ok(Self { inner })
    }

    /// Serialize rows into the snapshot format.
    pub fn to_json(rows: &[Row]) -> Result<String, SourceError> {
        let page = EntityPage {
            entities: rows.iter().map(WireEntity::from_row).collect(),
        };
        serde_json::to_string_pretty(&page)
            .map_err(|e| SourceError::InvalidResponse(format!("snapshot: {e}")))
    }

    pub fn row_count(&self) -> usize {
        self.inner.row_count()
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetch_count()
    }
}

#[async_trait]
impl RecordSource for SnapshotSource {
    async fn fetch(&self, table: &Table, criterion: &Criterion) -> Result<Vec<Row>, SourceError> {
        self.inner.fetch(table, criterion).await
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
