//! Root-plus-descendants extraction.
//!
//! Every view is built the same way: start a record from the root row, walk
//! everything reachable below it, let the view copy what it recognizes, then
//! run the post-extraction filter. Views differ only in [`DomainExtractor`]'s
//! `start`/`visit`/`finish` rules.

use crate::query::{Filterable, RecordFilter};
use crate::schema;
use labgraph_graph::{descendants, NodeId, RelationGraph, Row, Table};

pub trait DomainExtractor {
    type Record: Filterable;

    /// A fresh record holding whatever the root row carries directly.
    fn start(&self, root: &Row) -> Self::Record;

    /// Fold one descendant into the record. Rows the view does not
    /// recognize are ignored.
    fn visit(&self, graph: &RelationGraph, record: &mut Self::Record, row: &Row);

    fn finish(&self, _record: &mut Self::Record) {}

    /// One record per root, in root order, minus those the filter rejects.
    /// A root with no descendants still produces a record.
    fn extract(
        &self,
        graph: &RelationGraph,
        roots: &[NodeId],
        filter: &RecordFilter,
    ) -> Vec<Self::Record> {
        let mut records = Vec::with_capacity(roots.len());
        for root_id in roots {
            let Some(root) = graph.get(root_id) else {
                tracing::debug!(root = %root_id, "root not in graph");
                continue;
            };
            let mut record = self.start(root);
            for row in descendants(graph, root_id) {
                self.visit(graph, &mut record, row);
            }
            self.finish(&mut record);
            if filter.accepts(&record) {
                records.push(record);
            } else {
                tracing::trace!(root = %root_id, "record filtered out");
            }
        }
        records
    }
}

/// Rows of `table` one edge below `row`.
pub fn linked<'g>(
    graph: &'g RelationGraph,
    row: &Row,
    table: &'g Table,
) -> impl Iterator<Item = &'g Row> + 'g {
    graph
        .node(&row.node_id())
        .into_iter()
        .flat_map(move |idx| graph.successors(idx))
        .filter_map(move |succ| graph.row(succ))
        .filter(move |succ| succ.table() == table)
}

/// Content-type label of a Content row (`"Mouse"`, `"Reagent"`, ...).
pub fn content_kind(row: &Row) -> Option<String> {
    row.label(schema::content::FK_CONTENT_TYPE)
}

pub fn is_content_kind(row: &Row, kind: &str) -> bool {
    row.table() == &Table::Content && content_kind(row).as_deref() == Some(kind)
}

/// Test label of a Result row (`"Mouse Session"`, `"Titer"`, ...).
pub fn result_test(row: &Row) -> Option<String> {
    row.label(schema::result::FK_TEST)
}

/// Push `value` unless it is already present.
pub fn push_unique(list: &mut Vec<String>, value: Option<String>) {
    if let Some(value) = value {
        if !list.contains(&value) {
            list.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use labgraph_graph::JoinStep;

    #[derive(Debug, Default)]
    struct Collected {
        root: String,
        seen: Vec<String>,
        subject: Option<String>,
    }

    impl Filterable for Collected {
        fn subject_ids(&self) -> Vec<&str> {
            self.subject.as_deref().into_iter().collect()
        }

        fn timestamp(&self) -> Option<DateTime<Utc>> {
            None
        }
    }

    struct Collector;

    impl DomainExtractor for Collector {
        type Record = Collected;

        fn start(&self, root: &Row) -> Collected {
            Collected {
                root: root.node_id().to_string(),
                ..Default::default()
            }
        }

        fn visit(&self, _graph: &RelationGraph, record: &mut Collected, row: &Row) {
            if is_content_kind(row, schema::kinds::MOUSE) {
                record.subject = row.text(schema::content::BARCODE);
            }
            record.seen.push(row.node_id().to_string());
        }
    }

    fn two_runs() -> (RelationGraph, Vec<NodeId>) {
        let mut graph = RelationGraph::new();
        let runs = vec![Row::new("ExperimentRun", 1), Row::new("ExperimentRun", 2)];
        graph.add_rows(runs.iter().cloned());
        let steps = vec![Row::new("ExperimentRunStep", 10).with("xprs_fk_experimentRun", 1)];
        graph.integrate(
            &JoinStep::back_reference("ExperimentRun", "ExperimentRunStep", "xprs_fk_experimentRun"),
            &runs,
            &steps,
        );
        let mouse = vec![Row::new("Content", 100)
            .with("cntn_barCode", "614173")
            .with_display("cntn_fk_contentType", 5, "Mouse")];
        let step_with_mouse = vec![steps[0].clone().with("xprs_cf_fk_mouse", 100)];
        graph.integrate(
            &JoinStep::forward("ExperimentRunStep", ["xprs_cf_fk_mouse"], "Content", "cntn_pk"),
            &step_with_mouse,
            &mouse,
        );
        (graph, runs.iter().map(Row::node_id).collect())
    }

    #[test]
    fn test_every_root_yields_a_record() {
        let (graph, roots) = two_runs();
        let records = Collector.extract(&graph, &roots, &RecordFilter::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].root, "ExperimentRun.1");
        assert_eq!(records[0].seen, vec!["ExperimentRunStep.10", "Content.100"]);
        assert_eq!(records[0].subject.as_deref(), Some("614173"));
        // No descendants, still reported.
        assert_eq!(records[1].root, "ExperimentRun.2");
        assert!(records[1].seen.is_empty());
    }

    #[test]
    fn test_filter_applies_after_walk() {
        let (graph, roots) = two_runs();
        let filter = RecordFilter {
            subject_id: Some("614173".to_string()),
            ..Default::default()
        };
        let records = Collector.extract(&graph, &roots, &filter);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].root, "ExperimentRun.1");
    }

    #[test]
    fn test_unknown_root_is_skipped() {
        let (graph, _) = two_runs();
        let records = Collector.extract(
            &graph,
            &[NodeId::new("ExperimentRun", 99)],
            &RecordFilter::default(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_linked_only_follows_one_edge() {
        let (graph, _) = two_runs();
        let run = graph.get(&NodeId::new("ExperimentRun", 1)).unwrap();
        let content = Table::Content;
        assert_eq!(linked(&graph, run, &content).count(), 0);
        let steps = Table::ExperimentRunStep;
        assert_eq!(linked(&graph, run, &steps).count(), 1);
    }
}
