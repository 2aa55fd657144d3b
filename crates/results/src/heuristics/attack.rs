use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Outcome of validating an attack identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackResolution {
    /// A current technique, software or group id.
    Known,
    /// A revoked id that maps onto its replacement.
    Deprecated(String),
    Unknown,
}

pub trait AttackIdentifierResolver: Send + Sync {
    fn resolve(&self, attack_id: &str) -> AttackResolution;
}

/// In-memory attack identifier tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackMap {
    #[serde(default)]
    pub techniques: BTreeSet<String>,

    #[serde(default)]
    pub software: BTreeSet<String>,

    #[serde(default)]
    pub groups: BTreeSet<String>,

    /// Deprecated id -> replacement id.
    #[serde(default)]
    pub revoked: BTreeMap<String, String>,
}

impl AttackMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_techniques<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.techniques.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_software<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.software.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_groups<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_revoked(mut self, deprecated: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.revoked.insert(deprecated.into(), replacement.into());
        self
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read attack map {}", path.display()))?;
        let map: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse attack map {}", path.display()))?;
        Ok(map)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read attack map {}", path.display()))?;
        let map: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse attack map {}", path.display()))?;
        Ok(map)
    }

    /// Loads a map from YAML or JSON, picking the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    pub fn is_known(&self, attack_id: &str) -> bool {
        self.techniques.contains(attack_id)
            || self.software.contains(attack_id)
            || self.groups.contains(attack_id)
    }
}

impl AttackIdentifierResolver for AttackMap {
    fn resolve(&self, attack_id: &str) -> AttackResolution {
        if self.is_known(attack_id) {
            AttackResolution::Known
        } else if let Some(replacement) = self.revoked.get(attack_id) {
            AttackResolution::Deprecated(replacement.clone())
        } else {
            AttackResolution::Unknown
        }
    }
}
