//! Assay Results - Analysis Result Aggregation
//!
//! This crate models the result a scanning service hands back to its
//! platform: a tree of evidence sections with typed bodies, extracted tags and
//! heuristic scores, finalized exactly once into a flat, scored report.

pub mod body;
pub mod core;
pub mod document;
pub mod heuristics;
pub mod manifest;
pub mod report;
pub mod result;
pub mod section;

pub use crate::body::{
    AttachmentRegistrar, BodyVariant, GraphBody, ImageBody, JsonBody, KeyValueBody, KvValue,
    MemoryDumpBody, MultiBody, ProcessItem, ProcessTreeBody, SectionBody, TableBody, TableRow,
    TextBody, UrlBody, UrlEntry,
};
pub use crate::core::{
    BodyFormat, Classification, ResultContext, ResultError, SafeStr, TextSanitizer,
};
pub use crate::document::{BodyDocument, HeuristicDocument, ResultDocument, SectionDocument};
pub use crate::heuristics::{
    AttackIdentifierResolver, AttackMap, AttackResolution, Heuristic, HeuristicCatalog,
    HeuristicDefinition, HeuristicId, HeuristicOptions, HeuristicSnapshot, HeuristicTable,
};
pub use crate::manifest::ServiceManifest;
pub use crate::report::{FinalReport, SectionRecord};
pub use crate::result::ServiceResult;
pub use crate::section::{
    HeuristicSlot, ParentRef, ResultSection, SectionBuilder, SectionId, TypedSectionId,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
