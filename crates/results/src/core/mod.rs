//! Core building blocks shared by every part of a result
//!
//! Error types, the body format tags understood by the rendering platform,
//! classification labels, text sanitizing, and the `ResultContext` that
//! carries the injected collaborators (heuristic catalog, attack resolver,
//! sanitizer) into every heuristic and section.

pub mod body_format;
pub mod classification;
pub mod context;
pub mod error;
pub mod sanitize;

pub use body_format::BodyFormat;
pub use classification::{Classification, DEFAULT_CLASSIFICATION};
pub use context::ResultContext;
pub use error::ResultError;
pub use sanitize::{SafeStr, TextSanitizer};
