use labgraph_graph::{
    collect_keys, descendants, Criterion, JoinExpander, JoinStep, KeyColumn, KeySet, KeyValue,
    MemorySource, NodeId, RelationGraph, Row,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

const MAX_INPUT_ROWS: usize = 12;
const MAX_KEY: i64 = 20;
const MAX_EDGES: usize = 60;
const MAX_NODES: usize = 16;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Each input row carries a list under column a and an optional scalar
/// under column b.
fn input_rows_strategy() -> impl Strategy<Value = Vec<(Vec<i64>, Option<i64>)>> {
    prop::collection::vec(
        (
            prop::collection::vec(0..MAX_KEY, 0..4),
            prop::option::of(0..MAX_KEY),
        ),
        1..=MAX_INPUT_ROWS,
    )
}

fn build_inputs(layout: &[(Vec<i64>, Option<i64>)]) -> Vec<Row> {
    layout.iter()
        .enumerate()
        .map(|(i, (a, b))| {
            let mut row = Row::new("Result", 1000 + i as i64).with("rslt_cf_fk_a", json!(a));
            if let Some(b) = b {
                row = row.with("rslt_cf_fk_b", *b);
            }
            row
        })
        .collect()
}

fn step() -> JoinStep {
    JoinStep::forward(
        "Result",
        ["rslt_cf_fk_a", "rslt_cf_fk_b"],
        "ReferenceDataRecord",
        "rdrc_pk",
    )
}

proptest! {
    #[test]
    fn prop_one_fetch_per_hop_with_deduplicated_union(
        layout in input_rows_strategy(),
        present in prop::collection::btree_set(0..MAX_KEY, 0..10),
    ) {
        let inputs = build_inputs(&layout);
        let source = Arc::new(MemorySource::from_rows(
            present.iter().map(|&k| Row::new("ReferenceDataRecord", k)),
        ));
        let expander = JoinExpander::new(source.clone());
        let mut graph = RelationGraph::new();
        graph.add_rows(inputs.iter().cloned());

        let fetched = runtime()
            .block_on(expander.expand(&step(), &inputs, Some(&mut graph)))
            .unwrap();

        let expected: KeySet = layout
            .iter()
            .flat_map(|(a, b)| a.iter().copied().chain(b.iter().copied()))
            .map(KeyValue::Int)
            .collect();

        let log = source.fetch_log();
        if expected.is_empty() {
            prop_assert_eq!(log.len(), 0);
            prop_assert!(fetched.is_empty());
        } else {
            prop_assert_eq!(log.len(), 1);
            prop_assert_eq!(
                &log[0].criterion,
                &Criterion::one_of("rdrc_pk", expected.iter().cloned())
            );
            let hit: BTreeSet<i64> = expected
                .iter()
                .filter_map(|k| match k { KeyValue::Int(i) => Some(*i), _ => None })
                .filter(|k| present.contains(k))
                .collect();
            prop_assert_eq!(fetched.len(), hit.len());
        }
    }

    #[test]
    fn prop_edges_do_not_depend_on_fetch_order(
        layout in input_rows_strategy(),
        present in prop::collection::vec(0..MAX_KEY, 0..10),
    ) {
        let inputs = build_inputs(&layout);
        let foreign: Vec<Row> = present.iter().map(|&k| Row::new("ReferenceDataRecord", k)).collect();
        let mut reversed = foreign.clone();
        reversed.reverse();

        let edges_of = |foreign: &[Row]| {
            let mut graph = RelationGraph::new();
            graph.add_rows(inputs.iter().cloned());
            graph.integrate(&step(), &inputs, foreign);
            let mut edges = BTreeSet::new();
            for (idx, row) in graph.rows() {
                for succ in graph.successors(idx) {
                    let target = graph.row(succ).unwrap();
                    edges.insert((row.node_id(), target.node_id()));
                }
            }
            edges
        };

        prop_assert_eq!(edges_of(&foreign), edges_of(&reversed));
    }

    #[test]
    fn prop_repeated_insertion_keeps_one_node(keys in prop::collection::vec(0..MAX_KEY, 0..40)) {
        let mut graph = RelationGraph::new();
        for &k in &keys {
            graph.add_row(Row::new("Content", k));
        }
        let distinct: BTreeSet<i64> = keys.iter().copied().collect();
        prop_assert_eq!(graph.len(), distinct.len());
    }

    #[test]
    fn prop_traversal_terminates_and_matches_reachability(
        node_count in 1usize..=MAX_NODES,
        raw_edges in prop::collection::vec((0usize..MAX_NODES, 0usize..MAX_NODES), 0..=MAX_EDGES),
        root in 0usize..MAX_NODES,
    ) {
        let root = root % node_count;
        let mut graph = RelationGraph::new();
        let ids: Vec<_> = (0..node_count)
            .map(|i| graph.add_row(Row::new("Content", i as i64)))
            .collect();
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .map(|(a, b)| (a % node_count, b % node_count))
            .collect();
        for &(a, b) in &edges {
            graph.add_edge(ids[a], ids[b]);
        }

        // Reference reachability by fixpoint iteration.
        let mut reach: BTreeSet<usize> = BTreeSet::new();
        let mut changed = true;
        while changed {
            changed = false;
            for &(a, b) in &edges {
                if (a == root || reach.contains(&a)) && reach.insert(b) {
                    changed = true;
                }
            }
        }
        reach.remove(&root);

        let found: Vec<usize> = descendants(&graph, &NodeId::new("Content", root as i64))
            .map(|row| match row.primary_key() {
                KeyValue::Int(i) => *i as usize,
                other => panic!("unexpected key {other}"),
            })
            .collect();
        let found_set: BTreeSet<usize> = found.iter().copied().collect();
        prop_assert_eq!(found.len(), found_set.len());
        prop_assert_eq!(found_set, reach);
    }
}

#[test]
fn scenario_three_results_two_reference_rows() {
    let results = vec![
        Row::new("Result", 1).with("rslt_cf_fk_a", json!([1, 2])),
        Row::new("Result", 2).with("rslt_cf_fk_b", json!([2, 3])),
        Row::new("Result", 3),
    ];
    let columns = [KeyColumn::named("rslt_cf_fk_a"), KeyColumn::named("rslt_cf_fk_b")];
    let keys = collect_keys(&results, &columns);
    assert_eq!(keys.len(), 3);

    let source = Arc::new(MemorySource::from_rows([
        Row::new("ReferenceDataRecord", 1),
        Row::new("ReferenceDataRecord", 3),
    ]));
    let expander = JoinExpander::new(source.clone());
    let mut graph = RelationGraph::new();
    graph.add_rows(results.iter().cloned());
    let fetched = runtime()
        .block_on(expander.expand(&step(), &results, Some(&mut graph)))
        .unwrap();

    assert_eq!(source.fetch_count(), 1);
    assert_eq!(fetched.len(), 2);
    assert_eq!(graph.len(), 5);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.contains(&NodeId::new("ReferenceDataRecord", 1)));
    assert!(!graph.contains(&NodeId::new("ReferenceDataRecord", 2)));
}
