//! Heuristic scoring and the external lookups it depends on
//!
//! The catalog and attack-identifier tables are owned by the platform; this
//! module only consumes them through the `HeuristicCatalog` and
//! `AttackIdentifierResolver` traits. In-memory implementations are provided
//! for manifests loaded from disk and for tests.

pub mod attack;
pub mod catalog;
pub mod heuristic;

pub use attack::{AttackIdentifierResolver, AttackMap, AttackResolution};
pub use catalog::{HeuristicCatalog, HeuristicDefinition, HeuristicId, HeuristicTable};
pub use heuristic::{Heuristic, HeuristicOptions, HeuristicSnapshot};
