//! Ecephys sessions.
//!
//! ```text
//! ExperimentRun ─► ExperimentRunStep ─┬─► ExperimentRunStepContent ─► Content (mouse)
//!                                     ├─► Result ─► ReferenceDataRecord (spouts, platform)
//!                                     └─► SOP
//! ```

use crate::client::Domain;
use crate::extract::{is_content_kind, push_unique, result_test, DomainExtractor};
use crate::plan::{
    linked_contents, run_steps, runs_of_template, step_contents, step_protocols, step_results,
    HopInput, Plan,
};
use crate::query::{DomainQuery, Filterable, RecordFilter};
use crate::schema::{self, content, reference, result, run, sop, step};
use crate::units::quantity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labgraph_graph::{JoinExpander, JoinStep, QueryResult, RelationGraph, Row, Table};
use serde::{Deserialize, Serialize};

pub const TEMPLATE: &str = "Ecephys Session";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcephysSession {
    pub run_name: Option<String>,
    pub session_name: Option<String>,
    pub session_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub subject_id: Option<String>,
    pub rig_id: Option<String>,
    pub experimenter: Option<String>,
    pub animal_weight_prior_g: Option<f64>,
    pub animal_weight_post_g: Option<f64>,
    pub reward_consumed_ml: Option<f64>,
    pub stream_modules: Vec<StreamModule>,
    pub reward_spouts: Vec<RewardSpout>,
    pub mouse_platform_name: Option<String>,
    pub active_mouse_platform: Option<bool>,
    pub protocol_names: Vec<String>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamModule {
    pub probe_name: Option<String>,
    pub arc_angle: Option<f64>,
    pub module_angle: Option<f64>,
    pub rotation_angle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSpout {
    pub name: Option<String>,
    pub side: Option<String>,
    pub spout_diameter_mm: Option<f64>,
    pub solution: Option<String>,
}

impl Filterable for EcephysSession {
    fn subject_ids(&self) -> Vec<&str> {
        self.subject_id.as_deref().into_iter().collect()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.start_time.or(self.created_on)
    }

    fn session_name(&self) -> Option<&str> {
        self.session_name.as_deref()
    }
}

pub struct Sessions;

impl DomainExtractor for Sessions {
    type Record = EcephysSession;

    fn start(&self, root: &Row) -> EcephysSession {
        EcephysSession {
            run_name: root.text(run::NAME),
            experimenter: root.label(run::CREATED_BY),
            created_on: root.timestamp(run::CREATED_ON),
            ..Default::default()
        }
    }

    fn visit(&self, _graph: &RelationGraph, record: &mut EcephysSession, row: &Row) {
        match row.table() {
            Table::ExperimentRunStep => {
                if record.experimenter.is_none() {
                    record.experimenter = row.label(step::CREATED_BY);
                }
            }
            Table::Content if is_content_kind(row, schema::kinds::MOUSE) => {
                record.subject_id = row.text(content::BARCODE);
            }
            Table::Result => match result_test(row).as_deref() {
                Some(schema::test_labels::MOUSE_SESSION) => {
                    record.session_name = row.text(result::SESSION_NAME);
                    record.session_type = row.label(result::SESSION_TYPE);
                    record.start_time = row.timestamp(result::START_TIME);
                    record.end_time = row.timestamp(result::END_TIME);
                    record.rig_id = row.text(result::RIG_ID);
                    record.reward_consumed_ml = quantity(row, result::REWARD_CONSUMED);
                    record.active_mouse_platform = row.boolean(result::ACTIVE_MOUSE_PLATFORM);
                }
                Some(schema::test_labels::MOUSE_WEIGHT) => {
                    record.animal_weight_prior_g = quantity(row, result::WEIGHT_PRIOR);
                    record.animal_weight_post_g = quantity(row, result::WEIGHT_POST);
                }
                Some(schema::test_labels::STREAM_MODULE) => record.stream_modules.push(StreamModule {
                    probe_name: row.label(result::FK_PROBE),
                    arc_angle: row.number(result::ARC_ANGLE),
                    module_angle: row.number(result::MODULE_ANGLE),
                    rotation_angle: row.number(result::ROTATION_ANGLE),
                }),
                _ => {}
            },
            Table::ReferenceDataRecord => match row.label(reference::FK_TYPE).as_deref() {
                Some(schema::reference_kinds::REWARD_SPOUT) => record.reward_spouts.push(RewardSpout {
                    name: row.text(reference::NAME),
                    side: row.text(reference::SIDE),
                    spout_diameter_mm: quantity(row, reference::SPOUT_DIAMETER),
                    solution: row.text(reference::SOLUTION),
                }),
                Some(schema::reference_kinds::MOUSE_PLATFORM) => {
                    record.mouse_platform_name = row.text(reference::NAME);
                }
                _ => {}
            },
            Table::Sop => push_unique(&mut record.protocol_names, row.text(sop::NAME)),
            _ => {}
        }
    }
}

#[async_trait]
impl Domain for Sessions {
    const NAME: &'static str = "sessions";

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
        // Spouts and platforms live in the same table; one lookup covers both.
        plan.hop(
            JoinStep::forward(
                Table::Result,
                [result::FK_REWARD_SPOUTS, result::FK_MOUSE_PLATFORM],
                Table::ReferenceDataRecord,
                reference::PK,
            ),
            [HopInput::Hop(results)],
        );
        plan
    }

    fn filter(&self, query: &DomainQuery) -> RecordFilter {
        query.filter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_shape() {
        let plan = Sessions.plan();
        assert_eq!(plan.len(), 6);
        assert_eq!(
            plan.waves().unwrap(),
            vec![vec![0], vec![1, 2, 3], vec![4, 5]]
        );
    }

    #[test]
    fn test_visit_dispatches_on_result_label() {
        let graph = RelationGraph::new();
        let mut record = Sessions.start(
            &Row::new("ExperimentRun", 1)
                .with("xprn_name", "run-1")
                .with_display("xprn_createdBy", 7, "Jane Doe"),
        );

        let weight = Row::new("Result", 2)
            .with_display("rslt_fk_test", 3, "Mouse Weight")
            .with("rslt_cf_weightPrior", "21.5 g")
            .with("rslt_cf_weightPost", 21.1);
        let module = Row::new("Result", 3)
            .with_display("rslt_fk_test", 4, "Stream Module")
            .with_display("rslt_cf_fk_probe", 9, "Probe A")
            .with("rslt_cf_arcAngle", 14.0);
        let unknown = Row::new("Result", 4).with_display("rslt_fk_test", 5, "Something Else");

        for row in [&weight, &module, &unknown] {
            Sessions.visit(&graph, &mut record, row);
        }

        assert_eq!(record.run_name.as_deref(), Some("run-1"));
        assert_eq!(record.experimenter.as_deref(), Some("Jane Doe"));
        assert_eq!(record.animal_weight_prior_g, Some(21.5));
        assert_eq!(record.animal_weight_post_g, Some(21.1));
        assert_eq!(record.stream_modules.len(), 1);
        assert_eq!(record.stream_modules[0].probe_name.as_deref(), Some("Probe A"));
        assert_eq!(record.stream_modules[0].arc_angle, Some(14.0));
    }

    #[test]
    fn test_sessions_keep_session_name_filter() {
        let query = DomainQuery::new().session_name("s1");
        assert_eq!(Sessions.filter(&query).session_name.as_deref(), Some("s1"));
    }
}
