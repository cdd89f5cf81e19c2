//! Labgraph: client-side joins over a join-free record store
//!
//! The record stores behind experiment metadata answer one question only:
//! "every row of table T matching criterion C". This crate rebuilds the
//! relational subgraph a domain view needs from that primitive:
//!
//! ```text
//!   roots ──hop──► children ──hop──► grandchildren ──hop──► reference data
//!     │              │                  │
//!     └──────────────┴──── RelationGraph (rows keyed by table.pk) ────┐
//!                                                                     ▼
//!                                               descendants(root) ► extractor
//! ```
//!
//! ## Key Properties
//!
//! - **Batched hops**: one remote fetch per [`JoinStep`], however many input
//!   rows or key columns it spans; zero fetches when there are no keys.
//! - **Explicit direction**: every hop names its [`JoinDirection`]; edges
//!   always point from the row in hand to the row the hop fetched.
//! - **Idempotent nodes**: the same `(table, primary_key)` reached twice is
//!   one node; duplicate edges collapse.
//! - **Cycle-safe traversal**: [`descendants`] tracks visited nodes.
//!
//! A graph belongs to one request. It is built hop by hop, handed to
//! extraction as `&RelationGraph`, then dropped.

pub mod criterion;
pub mod error;
pub mod graph;
pub mod join;
pub mod keys;
pub mod row;
pub mod source;
pub mod traversal;

pub use criterion::Criterion;
pub use error::{QueryError, QueryResult};
pub use graph::{NodeIdx, RelationGraph};
pub use join::{JoinDirection, JoinExpander, JoinStep};
pub use keys::{collect_keys, KeyColumn, KeySet};
pub use row::{Attribute, KeyValue, NodeId, Row, Table};
pub use source::{FetchRecord, MemorySource, RecordSource, SourceError};
pub use traversal::{descendant_ids, descendants, Descendants};
