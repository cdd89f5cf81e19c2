//! The per-request relation graph.
//!
//! Nodes are rows keyed by `(table, primary_key)`; edges are directed,
//! unlabeled and deduplicated. Storage follows the usual columnar layout:
//! rows in a dense `Vec`, a hash index from node identity to slot, and one
//! roaring bitmap of successors per slot.

use crate::join::{JoinDirection, JoinStep};
use crate::row::{KeyValue, NodeId, Row, Table};
use ahash::AHashMap;
use roaring::RoaringBitmap;

/// Dense node slot inside one [`RelationGraph`].
pub type NodeIdx = u32;

#[derive(Debug, Default, Clone)]
pub struct RelationGraph {
    rows: Vec<Row>,
    index: AHashMap<NodeId, NodeIdx>,
    forward: Vec<RoaringBitmap>,
    edge_count: usize,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Register a row. Re-adding an identity that is already present is a
    /// no-op and returns the existing slot; the first copy wins.
    pub fn add_row(&mut self, row: Row) -> NodeIdx {
        let id = row.node_id();
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.rows.len() as NodeIdx;
        self.rows.push(row);
        self.forward.push(RoaringBitmap::new());
        self.index.insert(id, idx);
        idx
    }

    pub fn add_rows(&mut self, rows: impl IntoIterator<Item = Row>) -> Vec<NodeIdx> {
        rows.into_iter().map(|row| self.add_row(row)).collect()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<NodeIdx> {
        self.index.get(id).copied()
    }

    fn lookup(&self, table: &Table, key: &KeyValue) -> Option<NodeIdx> {
        // Cloning into a NodeId keeps the index keyed by one owned type.
        self.index
            .get(&NodeId {
                table: table.clone(),
                key: key.clone(),
            })
            .copied()
    }

    pub fn row(&self, idx: NodeIdx) -> Option<&Row> {
        self.rows.get(idx as usize)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Row> {
        self.row(self.node(id)?)
    }

    pub fn rows(&self) -> impl Iterator<Item = (NodeIdx, &Row)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (idx as NodeIdx, row))
    }

    pub fn rows_of<'g>(&'g self, table: &'g Table) -> impl Iterator<Item = &'g Row> + 'g {
        self.rows.iter().filter(move |row| row.table() == table)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Add `from -> to`. Returns `false` if either endpoint is unknown or the
    /// edge already exists.
    pub fn add_edge(&mut self, from: NodeIdx, to: NodeIdx) -> bool {
        if (to as usize) >= self.rows.len() {
            return false;
        }
        let Some(successors) = self.forward.get_mut(from as usize) else {
            return false;
        };
        let inserted = successors.insert(to);
        if inserted {
            self.edge_count += 1;
        }
        inserted
    }

    pub fn has_edge(&self, from: NodeIdx, to: NodeIdx) -> bool {
        self.forward
            .get(from as usize)
            .is_some_and(|successors| successors.contains(to))
    }

    pub fn successors(&self, idx: NodeIdx) -> impl Iterator<Item = NodeIdx> + '_ {
        self.forward
            .get(idx as usize)
            .into_iter()
            .flat_map(|successors| successors.iter())
    }

    // ========================================================================
    // Hop integration
    // ========================================================================

    /// Register the rows fetched by `step` and add the edges they imply.
    /// Returns the number of new edges.
    pub fn integrate(&mut self, step: &JoinStep, input_rows: &[Row], foreign_rows: &[Row]) -> usize {
        self.add_rows(foreign_rows.iter().cloned());
        self.resolve_edges(step, input_rows, foreign_rows)
    }

    /// Add `input -> foreign` edges for one hop.
    ///
    /// Edges always point from the row that was in hand to the row the hop
    /// fetched; the step's direction only decides which side's values are
    /// read. Endpoints missing from the graph are skipped.
    pub fn resolve_edges(&mut self, step: &JoinStep, input_rows: &[Row], foreign_rows: &[Row]) -> usize {
        let mut added = 0;
        match step.direction {
            JoinDirection::Forward => {
                for input in input_rows {
                    let Some(from) = self.node(&input.node_id()) else {
                        continue;
                    };
                    for column in &step.input_key_columns {
                        for key in column.keys_of(input) {
                            if let Some(to) = self.lookup(&step.foreign_table, &key) {
                                added += usize::from(self.add_edge(from, to));
                            }
                        }
                    }
                }
            }
            JoinDirection::BackReference => {
                for foreign in foreign_rows {
                    let Some(to) = self.node(&foreign.node_id()) else {
                        continue;
                    };
                    for key in foreign.keys(&step.foreign_join_column) {
                        if let Some(from) = self.lookup(&step.input_table, &key) {
                            added += usize::from(self.add_edge(from, to));
                        }
                    }
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_row_is_idempotent() {
        let mut graph = RelationGraph::new();
        let a = graph.add_row(Row::new("Content", 1).with("cntn_barCode", "first"));
        let b = graph.add_row(Row::new("Content", 1).with("cntn_barCode", "second"));
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
        let row = graph.get(&NodeId::new("Content", 1)).unwrap();
        assert_eq!(row.text("cntn_barCode").as_deref(), Some("first"));
    }

    #[test]
    fn test_same_key_in_different_tables_are_distinct_nodes() {
        let mut graph = RelationGraph::new();
        graph.add_row(Row::new("Content", 1));
        graph.add_row(Row::new("Result", 1));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = RelationGraph::new();
        let a = graph.add_row(Row::new("ExperimentRun", 1));
        let b = graph.add_row(Row::new("ExperimentRunStep", 2));
        assert!(graph.add_edge(a, b));
        assert!(!graph.add_edge(a, b));
        assert!(!graph.add_edge(a, 99));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(a, b));
        assert!(!graph.has_edge(b, a));
    }

    #[test]
    fn test_forward_edges_follow_list_keys() {
        let mut graph = RelationGraph::new();
        let inputs = vec![Row::new("ExperimentRunStep", 1).with("xprs_cf_fk_reagents", json!([7, 8]))];
        let foreign = vec![Row::new("Content", 7), Row::new("Content", 8)];
        graph.add_rows(inputs.iter().cloned());
        let step = JoinStep::forward(
            "ExperimentRunStep",
            ["xprs_cf_fk_reagents"],
            "Content",
            "cntn_pk",
        );
        assert_eq!(graph.integrate(&step, &inputs, &foreign), 2);
        let from = graph.node(&NodeId::new("ExperimentRunStep", 1)).unwrap();
        assert_eq!(graph.successors(from).count(), 2);
    }

    #[test]
    fn test_back_reference_edges_point_from_input() {
        let mut graph = RelationGraph::new();
        let runs = vec![Row::new("ExperimentRun", 1), Row::new("ExperimentRun", 2)];
        graph.add_rows(runs.iter().cloned());
        let steps = vec![
            Row::new("ExperimentRunStep", 10).with("xprs_fk_experimentRun", 1),
            Row::new("ExperimentRunStep", 11).with("xprs_fk_experimentRun", 2),
            Row::new("ExperimentRunStep", 12).with("xprs_fk_experimentRun", 3),
        ];
        let step = JoinStep::back_reference("ExperimentRun", "ExperimentRunStep", "xprs_fk_experimentRun");
        assert_eq!(graph.integrate(&step, &runs, &steps), 2);

        let run1 = graph.node(&NodeId::new("ExperimentRun", 1)).unwrap();
        let step10 = graph.node(&NodeId::new("ExperimentRunStep", 10)).unwrap();
        let step12 = graph.node(&NodeId::new("ExperimentRunStep", 12)).unwrap();
        assert!(graph.has_edge(run1, step10));
        assert_eq!(graph.successors(step12).count(), 0);
    }

    #[test]
    fn test_back_reference_accepts_list_values() {
        let mut graph = RelationGraph::new();
        let materials = vec![Row::new("Content", 1), Row::new("Content", 2)];
        graph.add_rows(materials.iter().cloned());
        let injections = vec![Row::new("Content", 50).with("cntn_cf_fk_viralMaterials", json!([1, 2]))];
        let step = JoinStep::back_reference("Content", "Content", "cntn_cf_fk_viralMaterials");
        assert_eq!(graph.integrate(&step, &materials, &injections), 2);
    }

    #[test]
    fn test_missing_input_node_skips_edges() {
        let mut graph = RelationGraph::new();
        let inputs = vec![Row::new("Result", 1).with("rslt_cf_fk_a", 5)];
        let foreign = vec![Row::new("ReferenceDataRecord", 5)];
        let step = JoinStep::forward("Result", ["rslt_cf_fk_a"], "ReferenceDataRecord", "rdrc_pk");
        assert_eq!(graph.integrate(&step, &inputs, &foreign), 0);
        assert_eq!(graph.len(), 1);
    }
}
