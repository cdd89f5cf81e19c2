//! Water restriction periods.

use crate::client::Domain;
use crate::extract::{is_content_kind, result_test, DomainExtractor};
use crate::plan::{
    linked_contents, run_steps, runs_of_template, step_contents, step_results, HopInput, Plan,
};
use crate::query::{DomainQuery, Filterable};
use crate::schema::{self, content, result, run, step};
use crate::units::quantity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labgraph_graph::{JoinExpander, QueryResult, RelationGraph, Row, Table};
use serde::{Deserialize, Serialize};

pub const TEMPLATE: &str = "Water Restriction";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterRestriction {
    pub subject_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub baseline_weight_g: Option<f64>,
    pub target_weight_fraction: Option<f64>,
    pub minimum_daily_water_ml: Option<f64>,
    pub experimenter: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
}

impl Filterable for WaterRestriction {
    fn subject_ids(&self) -> Vec<&str> {
        self.subject_id.as_deref().into_iter().collect()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.start_time.or(self.created_on)
    }
}

pub struct WaterRestrictions;

impl DomainExtractor for WaterRestrictions {
    type Record = WaterRestriction;

    fn start(&self, root: &Row) -> WaterRestriction {
        WaterRestriction {
            experimenter: root.label(run::CREATED_BY),
            created_on: root.timestamp(run::CREATED_ON),
            ..Default::default()
        }
    }

    fn visit(&self, _graph: &RelationGraph, record: &mut WaterRestriction, row: &Row) {
        match row.table() {
            Table::ExperimentRunStep if record.experimenter.is_none() => {
                record.experimenter = row.label(step::CREATED_BY);
            }
            Table::Content if is_content_kind(row, schema::kinds::MOUSE) => {
                record.subject_id = row.text(content::BARCODE);
            }
            Table::Result
                if result_test(row).as_deref() == Some(schema::test_labels::WATER_RESTRICTION) =>
            {
                record.start_time = row.timestamp(result::START_TIME);
                record.end_time = row.timestamp(result::END_TIME);
                record.baseline_weight_g = quantity(row, result::BASELINE_WEIGHT);
                record.target_weight_fraction = quantity(row, result::TARGET_FRACTION);
                record.minimum_daily_water_ml = quantity(row, result::MINIMUM_WATER);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Domain for WaterRestrictions {
    const NAME: &'static str = "water-restrictions";

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
        plan.hop(step_results(), [HopInput::Hop(steps)]);
        plan.hop(linked_contents(), [HopInput::Hop(links)]);
        plan
    }
}
