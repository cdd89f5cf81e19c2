//! Forward reachability over a [`RelationGraph`].
//!
//! Extraction does not join along a fixed schema; it asks for "everything
//! below this root" and picks what it recognizes. The walk is lazy and
//! tracks visited slots, so it visits every reachable node exactly once and
//! terminates even if a cycle slipped into the graph.

use crate::graph::{NodeIdx, RelationGraph};
use crate::row::{NodeId, Row};
use roaring::RoaringBitmap;

/// Lazy breadth-first walk of the nodes below one root, root excluded.
pub struct Descendants<'g> {
    graph: &'g RelationGraph,
    visited: RoaringBitmap,
    frontier: Vec<NodeIdx>,
    pending: Vec<NodeIdx>,
}

impl<'g> Descendants<'g> {
    fn new(graph: &'g RelationGraph, root: NodeIdx) -> Self {
        let mut visited = RoaringBitmap::new();
        visited.insert(root);
        Self {
            graph,
            visited,
            frontier: Vec::new(),
            pending: vec![root],
        }
    }

    fn empty(graph: &'g RelationGraph) -> Self {
        Self {
            graph,
            visited: RoaringBitmap::new(),
            frontier: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Next reachable slot, in breadth-first order.
    fn next_idx(&mut self) -> Option<NodeIdx> {
        loop {
            if let Some(idx) = self.frontier.pop() {
                self.pending.push(idx);
                return Some(idx);
            }
            if self.pending.is_empty() {
                return None;
            }
            // Expand the whole previous layer at once.
            let layer = std::mem::take(&mut self.pending);
            let mut next = Vec::new();
            for idx in layer {
                for succ in self.graph.successors(idx) {
                    if self.visited.insert(succ) {
                        next.push(succ);
                    }
                }
            }
            next.reverse();
            self.frontier = next;
            if self.frontier.is_empty() {
                return None;
            }
        }
    }
}

impl<'g> Iterator for Descendants<'g> {
    type Item = &'g Row;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next_idx()?;
        self.graph.row(idx)
    }
}

/// Rows reachable from `root` by following edges forward. An unknown root
/// yields nothing.
pub fn descendants<'g>(graph: &'g RelationGraph, root: &NodeId) -> Descendants<'g> {
    match graph.node(root) {
        Some(idx) => Descendants::new(graph, idx),
        None => Descendants::empty(graph),
    }
}

/// Slots reachable from `root`, root excluded, materialized as a bitmap.
pub fn descendant_ids(graph: &RelationGraph, root: NodeIdx) -> RoaringBitmap {
    let mut walk = Descendants::new(graph, root);
    let mut out = RoaringBitmap::new();
    while let Some(idx) = walk.next_idx() {
        out.insert(idx);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn chain() -> (RelationGraph, Vec<NodeIdx>) {
        let mut graph = RelationGraph::new();
        let a = graph.add_row(Row::new("ExperimentRun", 1));
        let b = graph.add_row(Row::new("ExperimentRunStep", 2));
        let c = graph.add_row(Row::new("Result", 3));
        let d = graph.add_row(Row::new("ExperimentRun", 4));
        let e = graph.add_row(Row::new("ExperimentRunStep", 5));
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        graph.add_edge(d, e);
        (graph, vec![a, b, c, d, e])
    }

    #[test]
    fn test_descendants_cover_all_hops_and_exclude_other_roots() {
        let (graph, _) = chain();
        let found: HashSet<String> = descendants(&graph, &NodeId::new("ExperimentRun", 1))
            .map(|row| row.node_id().to_string())
            .collect();
        let expected: HashSet<String> = ["ExperimentRunStep.2", "Result.3"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_descendants_terminate_on_cycles() {
        let (mut graph, ids) = chain();
        graph.add_edge(ids[2], ids[0]);
        graph.add_edge(ids[2], ids[1]);
        let found: Vec<_> = descendants(&graph, &NodeId::new("ExperimentRun", 1)).collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unknown_root_yields_nothing() {
        let (graph, _) = chain();
        assert_eq!(descendants(&graph, &NodeId::new("ExperimentRun", 99)).count(), 0);
    }

    #[test]
    fn test_descendant_ids_matches_iterator() {
        let (graph, ids) = chain();
        let set = descendant_ids(&graph, ids[0]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![ids[1], ids[2]]);
        assert!(descendant_ids(&graph, ids[2]).is_empty());
    }
}
