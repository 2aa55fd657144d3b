//! Command implementations for the Assay CLI
//!
//! `finalize` turns a declarative result document into the finalized report a
//! platform would receive, and `heuristics` shows the catalog a manifest
//! declares so documents can be checked against it.

pub mod finalize;
pub mod heuristics;
