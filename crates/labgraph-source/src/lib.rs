//! Record-store backends for Labgraph.
//!
//! - [`SnapshotSource`]: a JSON snapshot evaluated in memory (offline runs,
//!   fixtures)
//! - [`RestSource`]: the live store's advanced-search REST API
//!
//! Both implement [`labgraph_graph::RecordSource`] and share the entity wire
//! format in [`wire`].

pub mod config;
pub mod rest;
pub mod snapshot;
pub mod wire;

pub use config::{query_deadline, ConfigError, SourceConfig};
pub use rest::RestSource;
pub use snapshot::SnapshotSource;
