//! Caller-facing query parameters and the post-extraction filter.

use chrono::{DateTime, Utc};
use labgraph_graph::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};

/// Parameters shared by every domain entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Only consulted by the sessions view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

impl DomainQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Reject malformed input before anything reaches the record store.
    ///
    /// A subject id that is present but blank is a caller error, distinct
    /// from no subject id at all.
    pub fn validate(&self) -> QueryResult<()> {
        if let Some(subject) = &self.subject_id {
            if subject.trim().is_empty() {
                return Err(QueryError::InvalidInput(
                    "subject_id must not be empty".to_string(),
                ));
            }
        }
        if let Some(name) = &self.session_name {
            if name.trim().is_empty() {
                return Err(QueryError::InvalidInput(
                    "session_name must not be empty".to_string(),
                ));
            }
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(QueryError::InvalidInput(format!(
                    "start {start} is after end {end}"
                )));
            }
        }
        Ok(())
    }

    pub fn subject_trimmed(&self) -> Option<&str> {
        self.subject_id.as_deref().map(str::trim)
    }

    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            subject_id: self.subject_trimmed().map(str::to_string),
            start: self.start,
            end: self.end,
            session_name: self.session_name.as_ref().map(|s| s.trim().to_string()),
        }
    }
}

/// What a record exposes to the post-extraction filter.
pub trait Filterable {
    /// Every subject id the record is about. Empty when none was found.
    fn subject_ids(&self) -> Vec<&str>;

    /// The record's primary timestamp, re-checked against the date range.
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    fn session_name(&self) -> Option<&str> {
        None
    }
}

/// Post-extraction filter.
///
/// Root queries already carry whatever constraints the store can evaluate;
/// this re-checks them on the finished record, together with constraints
/// that only become known after expansion (a subject id found several hops
/// below the root).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub subject_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub session_name: Option<String>,
}

impl RecordFilter {
    pub fn accepts<R: Filterable + ?Sized>(&self, record: &R) -> bool {
        if let Some(subject) = &self.subject_id {
            if !record.subject_ids().iter().any(|s| s.trim() == subject.as_str()) {
                return false;
            }
        }

        // A record without a timestamp cannot be placed in the range; the
        // root query already bounded it, so it stays.
        if let Some(ts) = record.timestamp() {
            if self.start.is_some_and(|start| ts < start) {
                return false;
            }
            if self.end.is_some_and(|end| ts > end) {
                return false;
            }
        }

        if let Some(name) = &self.session_name {
            if record.session_name().map(str::trim) != Some(name.as_str()) {
                return false;
            }
        }

        true
    }

    pub fn without_session_name(mut self) -> Self {
        self.session_name = None;
        self
    }
}
