//! Batched hops.
//!
//! A [`JoinStep`] describes one relationship between the rows already in
//! hand and a foreign table. [`JoinExpander::expand`] turns it into exactly
//! one remote fetch: the keys of every input row are collected first and
//! sent as a single "is one of" criterion, so a hop over a thousand rows
//! costs the same single round trip as a hop over one.

use crate::criterion::Criterion;
use crate::error::{QueryError, QueryResult};
use crate::graph::RelationGraph;
use crate::keys::{collect_keys, KeyColumn, KeySet};
use crate::row::{Row, Table};
use crate::source::RecordSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Which side of a hop holds the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinDirection {
    /// Input rows store the foreign rows' primary keys; the join column is
    /// the foreign table's own primary key.
    Forward,
    /// Foreign rows store the input rows' primary keys in the join column.
    BackReference,
}

impl JoinDirection {
    /// Direction implied by the record store's column naming: a join on the
    /// foreign table's `*_pk` column is a forward hop, anything else is a
    /// back-reference.
    pub fn infer(foreign_join_column: &str) -> Self {
        if foreign_join_column.ends_with("_pk") {
            JoinDirection::Forward
        } else {
            JoinDirection::BackReference
        }
    }
}

/// One hop of a domain plan.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinStep {
    pub input_table: Table,
    pub input_key_columns: Vec<KeyColumn>,
    pub foreign_table: Table,
    pub foreign_join_column: String,
    pub direction: JoinDirection,
    pub extra_criteria: Option<Criterion>,
}

impl JoinStep {
    /// Input rows reference foreign rows by primary key through any of
    /// `input_key_columns`.
    pub fn forward<I, K>(
        input_table: impl Into<Table>,
        input_key_columns: I,
        foreign_table: impl Into<Table>,
        foreign_pk_column: &str,
    ) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<KeyColumn>,
    {
        Self {
            input_table: input_table.into(),
            input_key_columns: input_key_columns.into_iter().map(Into::into).collect(),
            foreign_table: foreign_table.into(),
            foreign_join_column: foreign_pk_column.to_string(),
            direction: JoinDirection::Forward,
            extra_criteria: None,
        }
        .checked()
    }

    /// Foreign rows point back at the input rows' primary keys through
    /// `back_reference_column`.
    pub fn back_reference(
        input_table: impl Into<Table>,
        foreign_table: impl Into<Table>,
        back_reference_column: &str,
    ) -> Self {
        Self {
            input_table: input_table.into(),
            input_key_columns: vec![KeyColumn::PrimaryKey],
            foreign_table: foreign_table.into(),
            foreign_join_column: back_reference_column.to_string(),
            direction: JoinDirection::BackReference,
            extra_criteria: None,
        }
        .checked()
    }

    /// Whether the declared direction agrees with the store's column naming.
    /// A disagreement is legal but usually a typo in the join column.
    pub fn follows_naming_convention(&self) -> bool {
        JoinDirection::infer(&self.foreign_join_column) == self.direction
    }

    fn checked(self) -> Self {
        if !self.follows_naming_convention() {
            tracing::warn!(
                foreign_table = %self.foreign_table,
                join_column = %self.foreign_join_column,
                direction = ?self.direction,
                "join direction disagrees with the column naming convention"
            );
        }
        self
    }

    pub fn with_criteria(mut self, criterion: Criterion) -> Self {
        self.extra_criteria = Some(match self.extra_criteria.take() {
            Some(existing) => existing.and(criterion),
            None => criterion,
        });
        self
    }

    /// The criterion issued for `keys`.
    pub fn criterion_for(&self, keys: KeySet) -> Criterion {
        let membership = Criterion::one_of(&self.foreign_join_column, keys);
        match &self.extra_criteria {
            Some(extra) => membership.and(extra.clone()),
            None => membership,
        }
    }

    pub fn collect_keys(&self, input_rows: &[Row]) -> KeySet {
        collect_keys(input_rows, &self.input_key_columns)
    }
}

/// Executes hops against one record source, under an optional deadline.
#[derive(Clone)]
pub struct JoinExpander {
    source: Arc<dyn RecordSource>,
    deadline: Option<Instant>,
}

impl JoinExpander {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            deadline: None,
        }
    }

    /// Abort any hop still in flight at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    /// One plain round trip (root queries).
    pub async fn fetch(&self, table: &Table, criterion: &Criterion) -> QueryResult<Vec<Row>> {
        fetch_with_deadline(self.source.as_ref(), self.deadline, table, criterion).await
    }

    /// Run one hop: at most one remote fetch, none when the input yields no
    /// keys. With a graph, fetched rows become nodes and edges are resolved.
    pub async fn expand(
        &self,
        step: &JoinStep,
        input_rows: &[Row],
        graph: Option<&mut RelationGraph>,
    ) -> QueryResult<Vec<Row>> {
        let keys = step.collect_keys(input_rows);
        if keys.is_empty() {
            tracing::debug!(
                foreign_table = %step.foreign_table,
                input_rows = input_rows.len(),
                "hop skipped: no keys"
            );
            return Ok(Vec::new());
        }

        let key_count = keys.len();
        let criterion = step.criterion_for(keys);
        let rows = self.fetch(&step.foreign_table, &criterion).await?;

        let edges = graph.map(|graph| graph.integrate(step, input_rows, &rows));
        tracing::debug!(
            foreign_table = %step.foreign_table,
            join_column = %step.foreign_join_column,
            keys = key_count,
            rows = rows.len(),
            edges = edges.unwrap_or(0),
            "expanded hop"
        );
        Ok(rows)
    }

    /// Run hops that do not depend on each other. Fetches run concurrently;
    /// results are integrated into the graph afterwards, in step order.
    /// The first failure aborts the remaining fetches.
    pub async fn expand_independent(
        &self,
        hops: &[(&JoinStep, &[Row])],
        graph: &mut RelationGraph,
    ) -> QueryResult<Vec<Vec<Row>>> {
        let mut tasks = JoinSet::new();
        let mut results: Vec<Option<Vec<Row>>> = vec![None; hops.len()];

        for (idx, (step, input_rows)) in hops.iter().enumerate() {
            let keys = step.collect_keys(input_rows);
            if keys.is_empty() {
                results[idx] = Some(Vec::new());
                continue;
            }
            let criterion = step.criterion_for(keys);
            let table = step.foreign_table.clone();
            let source = Arc::clone(&self.source);
            let deadline = self.deadline;
            tasks.spawn(async move {
                let rows = fetch_with_deadline(source.as_ref(), deadline, &table, &criterion).await;
                (idx, rows)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (idx, rows) = joined.map_err(|e| QueryError::Task(e.to_string()))?;
            results[idx] = Some(rows?);
        }

        let mut out = Vec::with_capacity(hops.len());
        for ((step, input_rows), rows) in hops.iter().zip(results) {
            let rows = rows.unwrap_or_default();
            let edges = graph.integrate(step, input_rows, &rows);
            tracing::debug!(
                foreign_table = %step.foreign_table,
                rows = rows.len(),
                edges,
                "expanded independent hop"
            );
            out.push(rows);
        }
        Ok(out)
    }
}

async fn fetch_with_deadline(
    source: &dyn RecordSource,
    deadline: Option<Instant>,
    table: &Table,
    criterion: &Criterion,
) -> QueryResult<Vec<Row>> {
    let fetch = source.fetch(table, criterion);
    let rows = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fetch)
            .await
            .map_err(|_| QueryError::DeadlineExceeded {
                table: table.clone(),
            })??,
        None => fetch.await?,
    };
    Ok(rows)
}
