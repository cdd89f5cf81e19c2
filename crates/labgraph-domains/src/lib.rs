//! Experiment-metadata views over the Labgraph join engine.
//!
//! Each view is a [`Domain`]: a root query, a [`Plan`] of hops below the
//! roots, and a [`DomainExtractor`] that folds every descendant of a root
//! into one flat record. [`MetadataClient`] runs them:
//!
//! ```text
//!   DomainQuery ─validate─► select_roots ─► Plan::execute ─► extract ─► filter
//!                                 │              │
//!                                 └── JoinExpander (one fetch per hop) ──► RecordSource
//! ```
//!
//! | Entry point | Roots | Record |
//! |-------------|-------|--------|
//! | `get_sessions` | runs of the "Ecephys Session" template | [`EcephysSession`] |
//! | `get_histology_procedures` | runs of the "Histology" template | [`HistologyProcedure`] |
//! | `get_imaging_runs` | runs of the "SPIM Imaging" template | [`ImagingRun`] |
//! | `get_viral_injections` | "Viral Injection" contents | [`ViralInjection`] |
//! | `get_viral_materials` | "Viral Material" contents | [`ViralMaterial`] |
//! | `get_water_restrictions` | runs of the "Water Restriction" template | [`WaterRestriction`] |

pub mod client;
pub mod extract;
pub mod histology;
pub mod imaging;
pub mod plan;
pub mod query;
pub mod schema;
pub mod sessions;
pub mod units;
pub mod viral_injection;
pub mod viral_material;
pub mod water_restriction;

pub use client::{Domain, MetadataClient};
pub use extract::DomainExtractor;
pub use histology::{HistologyProcedure, Reagent, Wash};
pub use imaging::ImagingRun;
pub use plan::{HopInput, Plan, PlanOutput, PlannedHop};
pub use query::{DomainQuery, Filterable, RecordFilter};
pub use sessions::{EcephysSession, RewardSpout, StreamModule};
pub use viral_injection::{ViralInjection, ViralMaterialSummary};
pub use viral_material::{InjectionUse, ViralMaterial};
pub use water_restriction::WaterRestriction;
