use crate::row::Table;
use crate::source::SourceError;

/// Failure of one domain query. Nothing here is retried by the engine; the
/// partially built graph of a failed query is simply dropped.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Rejected before any remote call was issued.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("deadline exceeded while fetching {table}")]
    DeadlineExceeded { table: Table },
    #[error("fetch task failed: {0}")]
    Task(String),
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
