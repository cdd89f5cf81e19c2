//! Light-sheet imaging runs.

use crate::client::Domain;
use crate::extract::{is_content_kind, result_test, DomainExtractor};
use crate::plan::{
    linked_contents, run_steps, runs_of_template, step_contents, step_protocols, step_results,
    HopInput, Plan,
};
use crate::query::{DomainQuery, Filterable};
use crate::schema::{self, content, instrument, result, run, sop, step};
use crate::units::{quantities, quantity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labgraph_graph::{JoinExpander, JoinStep, QueryResult, RelationGraph, Row, Table};
use serde::{Deserialize, Serialize};

pub const TEMPLATE: &str = "SPIM Imaging";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagingRun {
    pub run_name: Option<String>,
    pub subject_id: Option<String>,
    pub instrument_id: Option<String>,
    pub chamber_immersion_medium: Option<String>,
    pub chamber_refractive_index: Option<f64>,
    pub brain_orientation: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub laser_wavelengths_nm: Vec<f64>,
    pub protocol_id: Option<String>,
    pub protocol_name: Option<String>,
    pub experimenter: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
}

impl Filterable for ImagingRun {
    fn subject_ids(&self) -> Vec<&str> {
        self.subject_id.as_deref().into_iter().collect()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.start_time.or(self.created_on)
    }
}

pub struct Imaging;

impl DomainExtractor for Imaging {
    type Record = ImagingRun;

    fn start(&self, root: &Row) -> ImagingRun {
        ImagingRun {
            run_name: root.text(run::NAME),
            experimenter: root.label(run::CREATED_BY),
            created_on: root.timestamp(run::CREATED_ON),
            ..Default::default()
        }
    }

    fn visit(&self, _graph: &RelationGraph, record: &mut ImagingRun, row: &Row) {
        match row.table() {
            Table::ExperimentRunStep => {
                if record.experimenter.is_none() {
                    record.experimenter = row.label(step::CREATED_BY);
                }
            }
            Table::Content if is_content_kind(row, schema::kinds::MOUSE) => {
                record.subject_id = row.text(content::BARCODE);
            }
            Table::Result
                if result_test(row).as_deref() == Some(schema::test_labels::SPIM_IMAGING) =>
            {
                record.chamber_immersion_medium = row.label(result::IMMERSION_MEDIUM);
                record.chamber_refractive_index = quantity(row, result::REFRACTIVE_INDEX);
                record.brain_orientation = row.label(result::BRAIN_ORIENTATION);
                record.start_time = row.timestamp(result::START_TIME);
                record.end_time = row.timestamp(result::END_TIME);
                record.laser_wavelengths_nm = quantities(row, result::LASER_WAVELENGTHS);
                // Replaced by the instrument's own name when that row is reached.
                if record.instrument_id.is_none() {
                    record.instrument_id = row.label(result::FK_INSTRUMENT);
                }
            }
            Table::Instrument => {
                if let Some(name) = row.text(instrument::NAME) {
                    record.instrument_id = Some(name);
                }
            }
            Table::Sop => {
                record.protocol_id = row.text(sop::LINK);
                record.protocol_name = row.text(sop::NAME);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Domain for Imaging {
    const NAME: &'static str = "imaging";

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
        let results = plan.hop(step_results(), [HopInput::Hop(steps)]);
        plan.hop(step_protocols(), [HopInput::Hop(steps)]);
        plan.hop(linked_contents(), [HopInput::Hop(links)]);
        plan.hop(
            JoinStep::forward(
                Table::Result,
                [result::FK_INSTRUMENT],
                Table::Instrument,
                instrument::PK,
            ),
            [HopInput::Hop(results)],
        );
        plan
    }
}
