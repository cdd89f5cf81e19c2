//! Viral injections and the materials they were mixed from.
//!
//! ```text
//! Content (injection) ─► Content (viral material) ─┬─► Content (plasmid)
//!                                                  └─► Result (titer)
//! ```

use crate::client::Domain;
use crate::extract::{is_content_kind, linked, result_test, DomainExtractor};
use crate::plan::{contents_of_type, HopInput, Plan};
use crate::query::{DomainQuery, Filterable};
use crate::schema::{self, content, result};
use crate::units::quantity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use labgraph_graph::{Criterion, JoinExpander, JoinStep, QueryResult, RelationGraph, Row, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViralInjection {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub intended_subject_id: Option<String>,
    pub volume_ul: Option<f64>,
    pub concentration: Option<f64>,
    pub date_made: Option<DateTime<Utc>>,
    pub prep_lot_number: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub viral_materials: Vec<ViralMaterialSummary>,
}

/// A material as seen from an injection that used it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViralMaterialSummary {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub material_type: Option<String>,
    pub titer: Option<f64>,
    pub plasmids: Vec<String>,
}

impl ViralMaterialSummary {
    /// Read a material row and what hangs directly off it.
    pub fn from_graph(graph: &RelationGraph, material: &Row) -> Self {
        let mut summary = Self {
            name: material.text(content::ID),
            barcode: material.text(content::BARCODE),
            material_type: material.label(content::MATERIAL_TYPE),
            ..Default::default()
        };
        let content_table = Table::Content;
        for plasmid in linked(graph, material, &content_table)
            .filter(|row| is_content_kind(row, schema::kinds::PLASMID))
        {
            if let Some(name) = plasmid.text(content::ID).or_else(|| plasmid.text(content::BARCODE)) {
                summary.plasmids.push(name);
            }
        }
        let result_table = Table::Result;
        summary.titer = linked(graph, material, &result_table)
            .filter(|row| result_test(row).as_deref() == Some(schema::test_labels::TITER))
            .find_map(|row| quantity(row, result::VALUE));
        summary
    }
}

impl Filterable for ViralInjection {
    fn subject_ids(&self) -> Vec<&str> {
        self.intended_subject_id.as_deref().into_iter().collect()
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_on
    }
}

pub struct ViralInjections;

impl DomainExtractor for ViralInjections {
    type Record = ViralInjection;

    fn start(&self, root: &Row) -> ViralInjection {
        ViralInjection {
            name: root.text(content::ID),
            barcode: root.text(content::BARCODE),
            intended_subject_id: root.text(content::INTENDED_SUBJECT_ID),
            volume_ul: quantity(root, content::VOLUME),
            concentration: quantity(root, content::CONCENTRATION),
            date_made: root.timestamp(content::DATE_MADE),
            prep_lot_number: root.text(content::PREP_LOT),
            created_on: root.timestamp(content::CREATED_ON),
            viral_materials: Vec::new(),
        }
    }

    fn visit(&self, graph: &RelationGraph, record: &mut ViralInjection, row: &Row) {
        // Plasmids and titers are read through their material.
        if is_content_kind(row, schema::kinds::VIRAL_MATERIAL) {
            record
                .viral_materials
                .push(ViralMaterialSummary::from_graph(graph, row));
        }
    }
}

#[async_trait]
impl Domain for ViralInjections {
    const NAME: &'static str = "viral-injections";

    async fn select_roots(
        &self,
        expander: &JoinExpander,
        query: &DomainQuery,
    ) -> QueryResult<Vec<Row>> {
        // The intended subject sits on the root itself, so the store can
        // evaluate it.
        let subject = query
            .subject_trimmed()
            .map(|s| Criterion::equals(content::INTENDED_SUBJECT_ID, s));
        contents_of_type(expander, schema::kinds::VIRAL_INJECTION, subject, query).await
    }

    fn plan(&self) -> Plan {
        let mut plan = Plan::new();
        let materials = plan.hop(material_lookup(), [HopInput::Roots]);
        plan.hop(plasmid_lookup(), [HopInput::Hop(materials)]);
        plan.hop(titer_lookup(), [HopInput::Hop(materials)]);
        plan
    }
}

fn material_lookup() -> JoinStep {
    JoinStep::forward(
        Table::Content,
        [content::FK_VIRAL_MATERIALS],
        Table::Content,
        content::PK,
    )
}

/// Plasmids referenced by the materials in hand.
pub(crate) fn plasmid_lookup() -> JoinStep {
    JoinStep::forward(
        Table::Content,
        [content::FK_PLASMIDS],
        Table::Content,
        content::PK,
    )
}

/// Results (titers) recorded against the materials in hand.
pub(crate) fn titer_lookup() -> JoinStep {
    JoinStep::back_reference(Table::Content, Table::Result, result::FK_CONTENT)
}
