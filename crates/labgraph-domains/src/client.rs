//! Domain query entry points.

use crate::extract::DomainExtractor;
use crate::histology::{Histology, HistologyProcedure};
use crate::imaging::{Imaging, ImagingRun};
use crate::plan::Plan;
use crate::query::{DomainQuery, RecordFilter};
use crate::sessions::{EcephysSession, Sessions};
use crate::viral_injection::{ViralInjection, ViralInjections};
use crate::viral_material::{ViralMaterial, ViralMaterials};
use crate::water_restriction::{WaterRestriction, WaterRestrictions};
use async_trait::async_trait;
use labgraph_graph::{JoinExpander, QueryResult, RecordSource, Row};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One domain view: how to pick its roots, which hops to expand below
/// them, and how to read the result.
#[async_trait]
pub trait Domain: DomainExtractor + Sync {
    const NAME: &'static str;

    async fn select_roots(
        &self,
        expander: &JoinExpander,
        query: &DomainQuery,
    ) -> QueryResult<Vec<Row>>;

    fn plan(&self) -> Plan;

    /// Post-extraction filter for `query`. Only sessions carry a name.
    fn filter(&self, query: &DomainQuery) -> RecordFilter {
        query.filter().without_session_name()
    }
}

/// Runs domain queries against one record source.
#[derive(Clone)]
pub struct MetadataClient {
    source: Arc<dyn RecordSource>,
    deadline: Option<Duration>,
}

impl MetadataClient {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            deadline: None,
        }
    }

    /// Bound every query, from root selection to the last hop.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    fn expander(&self) -> JoinExpander {
        let expander = JoinExpander::new(Arc::clone(&self.source));
        match self.deadline {
            Some(deadline) => expander.with_timeout(deadline),
            None => expander,
        }
    }

    /// Validate, select roots, expand, extract.
    pub async fn run<D: Domain>(&self, domain: &D, query: &DomainQuery) -> QueryResult<Vec<D::Record>> {
        query.validate()?;
        let started = Instant::now();
        let expander = self.expander();

        let roots = domain.select_roots(&expander, query).await?;
        let output = domain.plan().execute(&expander, roots).await?;
        let records = domain.extract(&output.graph, &output.roots, &domain.filter(query));

        tracing::info!(
            domain = D::NAME,
            source = self.source.name(),
            roots = output.roots.len(),
            nodes = output.graph.len(),
            edges = output.graph.edge_count(),
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "domain query complete"
        );
        Ok(records)
    }

    pub async fn get_sessions(&self, query: &DomainQuery) -> QueryResult<Vec<EcephysSession>> {
        self.run(&Sessions, query).await
    }

    pub async fn get_histology_procedures(
        &self,
        query: &DomainQuery,
    ) -> QueryResult<Vec<HistologyProcedure>> {
        self.run(&Histology, query).await
    }

    pub async fn get_imaging_runs(&self, query: &DomainQuery) -> QueryResult<Vec<ImagingRun>> {
        self.run(&Imaging, query).await
    }

    pub async fn get_viral_injections(
        &self,
        query: &DomainQuery,
    ) -> QueryResult<Vec<ViralInjection>> {
        self.run(&ViralInjections, query).await
    }

    pub async fn get_viral_materials(
        &self,
        query: &DomainQuery,
    ) -> QueryResult<Vec<ViralMaterial>> {
        self.run(&ViralMaterials, query).await
    }

    pub async fn get_water_restrictions(
        &self,
        query: &DomainQuery,
    ) -> QueryResult<Vec<WaterRestriction>> {
        self.run(&WaterRestrictions, query).await
    }
}
