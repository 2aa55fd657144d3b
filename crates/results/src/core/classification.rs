use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CLASSIFICATION: &str = "TLP:C";

/// Opaque classification label supplied by the platform.
///
/// The result model never interprets the label; it only stores it, compares it
/// and copies it into report records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classification(String);

impl Classification {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFICATION)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Classification {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Classification {
    fn from(label: String) -> Self {
        Self(label)
    }
}
