//! Histology procedures: one run per procedure, one wash per step, reagents
//! hanging off each wash.

use crate::client::Domain;
use crate::extract::{is_content_kind, linked, push_unique, DomainExtractor};
use crate::plan::{
    linked_contents, run_steps, runs_of_template, step_contents, step_protocols, HopInput, Plan,
};
use crate::query::{DomainQuery, Filterable};
use crate::schema::{self, content, run, sop, step};
use crate::units::quantity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labgraph_graph::{JoinExpander, JoinStep, QueryResult, RelationGraph, Row, Table};
use serde::{Deserialize, Serialize};

pub const TEMPLATE: &str = "Histology";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistologyProcedure {
    pub procedure_name: Option<String>,
    pub subject_id: Option<String>,
    pub experimenter: Option<String>,
    pub protocol_ids: Vec<String>,
    pub protocol_names: Vec<String>,
    pub washes: Vec<Wash>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wash {
    pub name: Option<String>,
    pub wash_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub mass_g: Option<f64>,
    pub reagents: Vec<Reagent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reagent {
    pub name: Option<String>,
    pub source: Option<String>,
    pub lot_number: Option<String>,
}

impl Filterable for HistologyProcedure {
    fn subject_ids(&self) -> Vec<&str> {
        self.subject_id.as_deref().into_iter().collect()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }
}

pub struct Histology;

impl DomainExtractor for Histology {
    type Record = HistologyProcedure;

    fn start(&self, root: &Row) -> HistologyProcedure {
        HistologyProcedure {
            procedure_name: root.text(run::NAME),
            experimenter: root.label(run::CREATED_BY),
            created_on: root.timestamp(run::CREATED_ON),
            ..Default::default()
        }
    }

    fn visit(&self, graph: &RelationGraph, record: &mut HistologyProcedure, row: &Row) {
        match row.table() {
            Table::ExperimentRunStep => {
                if record.experimenter.is_none() {
                    record.experimenter = row.label(step::CREATED_BY);
                }
                let content_table = Table::Content;
                let reagents: Vec<Reagent> = linked(graph, row, &content_table)
                    .filter(|c| is_content_kind(c, schema::kinds::REAGENT))
                    .map(|c| Reagent {
                        name: c.text(content::ID).or_else(|| c.text(content::BARCODE)),
                        source: c.label(content::SOURCE),
                        lot_number: c.text(content::LOT_NUMBER),
                    })
                    .collect();
                let wash_type = row.label(step::WASH_TYPE);
                // Steps without a wash type or reagents are bookkeeping, not washes.
                if wash_type.is_some() || !reagents.is_empty() {
                    record.washes.push(Wash {
                        name: row.text(step::NAME),
                        wash_type,
                        start_time: row.timestamp(step::START_TIME),
                        end_time: row.timestamp(step::END_TIME),
                        mass_g: quantity(row, step::MASS),
                        reagents,
                    });
                }
            }
            Table::Content if is_content_kind(row, schema::kinds::MOUSE) => {
                record.subject_id = row.text(content::BARCODE);
            }
            Table::Sop => {
                push_unique(&mut record.protocol_ids, row.text(sop::LINK));
                push_unique(&mut record.protocol_names, row.text(sop::NAME));
            }
            _ => {}
        }
    }

    fn finish(&self, record: &mut HistologyProcedure) {
        // Undated washes go last, in visit order.
        record
            .washes
            .sort_by_key(|wash| (wash.start_time.is_none(), wash.start_time));
    }
}

#[async_trait]
impl Domain for Histology {
    const NAME: &'static str = "histology";

    async fn select_roots(
        &self,
        expander: &JoinExpander,
        query: &DomainQuery,
    ) -> QueryResult<Vec<Row>> {
        runs_of_template(expander, TEMPLATE, query).await
    }

    fn plan(&self) -> Plan {
        let mut plan = Plan::new();
        let steps = plan.hop(run_steps(), [HopInput::Roots]);
        let links = plan.hop(step_contents(), [HopInput::Hop(steps)]);
        plan.hop(step_protocols(), [HopInput::Hop(steps)]);
        plan.hop(
            JoinStep::forward(
                Table::ExperimentRunStep,
                [step::FK_REAGENTS],
                Table::Content,
                content::PK,
            ),
            [HopInput::Hop(steps)],
        );
        plan.hop(linked_contents(), [HopInput::Hop(links)]);
        plan
    }
}
