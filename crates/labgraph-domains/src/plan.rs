//! Declarative hop plans.
//!
//! A view describes its subgraph as a list of [`JoinStep`]s, each naming
//! where its input rows come from: the roots, or the rows fetched by an
//! earlier hop. Execution groups hops into waves by dependency depth. A
//! wave with one hop runs it directly; a wider wave fetches its hops
//! concurrently and integrates them in declaration order.

use crate::query::DomainQuery;
use crate::schema;
use labgraph_graph::{
    descendant_ids, Criterion, JoinExpander, JoinStep, NodeId, QueryError, QueryResult,
    RelationGraph, Row, Table,
};
use roaring::RoaringBitmap;
use std::collections::HashSet;

/// Where a hop takes its input rows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopInput {
    Roots,
    Hop(usize),
}

#[derive(Debug, Clone)]
pub struct PlannedHop {
    pub step: JoinStep,
    pub inputs: Vec<HopInput>,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    hops: Vec<PlannedHop>,
}

/// The assembled graph plus the root ids, deduplicated, in fetch order.
#[derive(Debug)]
pub struct PlanOutput {
    pub graph: RelationGraph,
    pub roots: Vec<NodeId>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hop; returns its index for later hops to depend on.
    pub fn hop(&mut self, step: JoinStep, inputs: impl IntoIterator<Item = HopInput>) -> usize {
        self.hops.push(PlannedHop {
            step,
            inputs: inputs.into_iter().collect(),
        });
        self.hops.len() - 1
    }

    pub fn hops(&self) -> &[PlannedHop] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Hop indices grouped by dependency depth. A hop may only depend on
    /// hops declared before it.
    pub fn waves(&self) -> QueryResult<Vec<Vec<usize>>> {
        let mut depth = Vec::with_capacity(self.hops.len());
        let mut waves: Vec<Vec<usize>> = Vec::new();

        for (idx, hop) in self.hops.iter().enumerate() {
            let mut level = 0;
            for input in &hop.inputs {
                if let HopInput::Hop(dep) = *input {
                    if dep >= idx {
                        return Err(QueryError::InvalidInput(format!(
                            "hop {idx} ({}) depends on hop {dep}, which is not declared before it",
                            hop.step.foreign_table
                        )));
                    }
                    level = level.max(depth[dep] + 1);
                }
            }
            depth.push(level);
            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(idx);
        }

        Ok(waves)
    }

    /// Build the graph below `roots`.
    pub async fn execute(&self, expander: &JoinExpander, roots: Vec<Row>) -> QueryResult<PlanOutput> {
        let waves = self.waves()?;
        let mut graph = RelationGraph::new();

        let mut seen = HashSet::new();
        let mut root_rows = Vec::with_capacity(roots.len());
        for row in roots {
            if seen.insert(row.node_id()) {
                graph.add_row(row.clone());
                root_rows.push(row);
            }
        }
        let root_ids: Vec<NodeId> = root_rows.iter().map(Row::node_id).collect();

        let mut fetched: Vec<Vec<Row>> = vec![Vec::new(); self.hops.len()];

        for wave in waves {
            let inputs: Vec<Vec<Row>> = wave
                .iter()
                .map(|&idx| self.input_rows(idx, &root_rows, &fetched))
                .collect();

            if let [idx] = wave.as_slice() {
                let rows = expander
                    .expand(&self.hops[*idx].step, &inputs[0], Some(&mut graph))
                    .await?;
                fetched[*idx] = rows;
            } else {
                let hops: Vec<(&JoinStep, &[Row])> = wave
                    .iter()
                    .zip(&inputs)
                    .map(|(&idx, rows)| (&self.hops[idx].step, rows.as_slice()))
                    .collect();
                let results = expander.expand_independent(&hops, &mut graph).await?;
                for (&idx, rows) in wave.iter().zip(results) {
                    fetched[idx] = rows;
                }
            }
        }

        tracing::debug!(
            roots = root_ids.len(),
            hops = self.hops.len(),
            nodes = graph.len(),
            edges = graph.edge_count(),
            "plan executed"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            let detached = detached_rows(&graph, &root_ids);
            if detached > 0 {
                tracing::debug!(detached, "fetched rows not reachable from any root");
            }
        }
        Ok(PlanOutput {
            graph,
            roots: root_ids,
        })
    }

    /// Rows feeding hop `idx`, restricted to the hop's input table.
    fn input_rows(&self, idx: usize, roots: &[Row], fetched: &[Vec<Row>]) -> Vec<Row> {
        let hop = &self.hops[idx];
        let mut rows = Vec::new();
        for input in &hop.inputs {
            let source = match *input {
                HopInput::Roots => roots,
                HopInput::Hop(dep) => fetched[dep].as_slice(),
            };
            rows.extend(
                source
                    .iter()
                    .filter(|row| row.table() == &hop.step.input_table)
                    .cloned(),
            );
        }
        rows
    }
}

/// Rows in `graph` that are neither a root nor below one. A fetched row ends
/// up here when the edge that should attach it could not be resolved.
pub fn detached_rows(graph: &RelationGraph, roots: &[NodeId]) -> usize {
    let mut attached = RoaringBitmap::new();
    for idx in roots.iter().filter_map(|id| graph.node(id)) {
        attached.insert(idx);
        attached |= descendant_ids(graph, idx);
    }
    graph.len() - attached.len() as usize
}

// ============================================================================
// Common hops
// ============================================================================

/// Steps of the runs in hand.
pub fn run_steps() -> JoinStep {
    JoinStep::back_reference(
        Table::ExperimentRun,
        Table::ExperimentRunStep,
        schema::step::FK_RUN,
    )
}

/// Content links of the steps in hand.
pub fn step_contents() -> JoinStep {
    JoinStep::back_reference(
        Table::ExperimentRunStep,
        Table::ExperimentRunStepContent,
        schema::step_content::FK_STEP,
    )
}

/// Results recorded against the steps in hand.
pub fn step_results() -> JoinStep {
    JoinStep::back_reference(Table::ExperimentRunStep, Table::Result, schema::result::FK_STEP)
}

/// Protocols the steps in hand follow.
pub fn step_protocols() -> JoinStep {
    JoinStep::forward(
        Table::ExperimentRunStep,
        [schema::step::FK_PROTOCOL],
        Table::Sop,
        schema::sop::PK,
    )
}

/// Contents (mice, reagents, ...) the content links point at.
pub fn linked_contents() -> JoinStep {
    JoinStep::forward(
        Table::ExperimentRunStepContent,
        [schema::step_content::FK_CONTENT],
        Table::Content,
        schema::content::PK,
    )
}

// ============================================================================
// Root selection
// ============================================================================

/// Runs created from the template named `template_name`, bounded by the
/// query's date range on the run's creation time.
pub async fn runs_of_template(
    expander: &JoinExpander,
    template_name: &str,
    query: &DomainQuery,
) -> QueryResult<Vec<Row>> {
    let templates = expander
        .fetch(
            &Table::ExperimentTemplate,
            &Criterion::equals(schema::template::NAME, template_name),
        )
        .await?;
    if templates.is_empty() {
        tracing::debug!(template = template_name, "no such experiment template");
        return Ok(Vec::new());
    }

    let mut step = JoinStep::back_reference(
        Table::ExperimentTemplate,
        Table::ExperimentRun,
        schema::run::FK_TEMPLATE,
    );
    if let Some(range) = Criterion::date_range(schema::run::CREATED_ON, query.start, query.end) {
        step = step.with_criteria(range);
    }
    expander.expand(&step, &templates, None).await
}

/// Contents of the content type named `type_name`, bounded by the query's
/// date range on creation time and by `extra` when given.
pub async fn contents_of_type(
    expander: &JoinExpander,
    type_name: &str,
    extra: Option<Criterion>,
    query: &DomainQuery,
) -> QueryResult<Vec<Row>> {
    let types = expander
        .fetch(
            &Table::ContentType,
            &Criterion::equals(schema::content_type::NAME, type_name),
        )
        .await?;
    if types.is_empty() {
        tracing::debug!(content_type = type_name, "no such content type");
        return Ok(Vec::new());
    }

    let mut step = JoinStep::back_reference(
        Table::ContentType,
        Table::Content,
        schema::content::FK_CONTENT_TYPE,
    );
    if let Some(range) = Criterion::date_range(schema::content::CREATED_ON, query.start, query.end) {
        step = step.with_criteria(range);
    }
    if let Some(extra) = extra {
        step = step.with_criteria(extra);
    }
    expander.expand(&step, &types, None).await
}
