//! Viral materials, with their plasmids, titer and the injections made from
//! them.

use crate::client::Domain;
use crate::extract::{is_content_kind, push_unique, result_test, DomainExtractor};
use crate::plan::{contents_of_type, HopInput, Plan};
use crate::query::{DomainQuery, Filterable};
use crate::schema::{self, content, result};
use crate::units::quantity;
use crate::viral_injection::{plasmid_lookup, titer_lookup};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labgraph_graph::{JoinExpander, JoinStep, QueryResult, RelationGraph, Row, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViralMaterial {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub material_type: Option<String>,
    pub titer: Option<f64>,
    pub created_on: Option<DateTime<Utc>>,
    pub plasmids: Vec<String>,
    pub injections: Vec<InjectionUse>,
}

/// An injection prepared from the material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InjectionUse {
    pub barcode: Option<String>,
    pub intended_subject_id: Option<String>,
}

impl Filterable for ViralMaterial {
    /// Every subject an injection made from this material was meant for.
    fn subject_ids(&self) -> Vec<&str> {
        self.injections
            .iter()
            .filter_map(|i| i.intended_subject_id.as_deref())
            .collect()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }
}

pub struct ViralMaterials;

impl DomainExtractor for ViralMaterials {
    type Record = ViralMaterial;

    fn start(&self, root: &Row) -> ViralMaterial {
        ViralMaterial {
            name: root.text(content::ID),
            barcode: root.text(content::BARCODE),
            material_type: root.label(content::MATERIAL_TYPE),
            created_on: root.timestamp(content::CREATED_ON),
            ..Default::default()
        }
    }

    fn visit(&self, _graph: &RelationGraph, record: &mut ViralMaterial, row: &Row) {
        match row.table() {
            Table::Content if is_content_kind(row, schema::kinds::PLASMID) => {
                push_unique(
                    &mut record.plasmids,
                    row.text(content::ID).or_else(|| row.text(content::BARCODE)),
                );
            }
            Table::Content if is_content_kind(row, schema::kinds::VIRAL_INJECTION) => {
                record.injections.push(InjectionUse {
                    barcode: row.text(content::BARCODE),
                    intended_subject_id: row.text(content::INTENDED_SUBJECT_ID),
                });
            }
            Table::Result
                if record.titer.is_none()
                    && result_test(row).as_deref() == Some(schema::test_labels::TITER) =>
            {
                record.titer = quantity(row, result::VALUE);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Domain for ViralMaterials {
    const NAME: &'static str = "viral-materials";

    async fn select_roots(
        &self,
        expander: &JoinExpander,
        query: &DomainQuery,
    ) -> QueryResult<Vec<Row>> {
        contents_of_type(expander, schema::kinds::VIRAL_MATERIAL, None, query).await
    }

    fn plan(&self) -> Plan {
        // All three hops start from the roots and run concurrently.
        let mut plan = Plan::new();
        plan.hop(plasmid_lookup(), [HopInput::Roots]);
        plan.hop(titer_lookup(), [HopInput::Roots]);
        plan.hop(injection_lookup(), [HopInput::Roots]);
        plan
    }
}

/// Injections list every material they were mixed from, so this
/// back-reference column is list-valued.
fn injection_lookup() -> JoinStep {
    JoinStep::back_reference(Table::Content, Table::Content, content::FK_VIRAL_MATERIALS)
}
