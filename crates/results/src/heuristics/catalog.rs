use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type HeuristicId = u32;

/// Static definition of a heuristic as declared in a service manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicDefinition {
    pub heur_id: HeuristicId,

    #[serde(default)]
    pub name: String,

    pub score: i64,

    /// Upper bound on the computed score. Zero means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<i64>,

    /// Default attack ids, used when the caller supplies none.
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attack_id: Vec<String>,

    /// Per-signature scores that take precedence over anything the caller submits.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signature_score_map: BTreeMap<String, i64>,

    #[serde(default = "default_filetype")]
    pub filetype: String,

    #[serde(default)]
    pub description: String,
}

fn default_filetype() -> String {
    "*".to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
    })
}

impl HeuristicDefinition {
    pub fn new(heur_id: HeuristicId, score: i64) -> Self {
        Self {
            heur_id,
            name: String::new(),
            score,
            max_score: None,
            attack_id: Vec::new(),
            signature_score_map: BTreeMap::new(),
            filetype: default_filetype(),
            description: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_score(mut self, max_score: i64) -> Self {
        self.max_score = Some(max_score);
        self
    }

    pub fn with_attack_id(mut self, attack_id: impl Into<String>) -> Self {
        self.attack_id.push(attack_id.into());
        self
    }

    pub fn with_signature_score(mut self, signature: impl Into<String>, score: i64) -> Self {
        self.signature_score_map.insert(signature.into(), score);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn effective_max_score(&self) -> Option<i64> {
        self.max_score.filter(|max| *max != 0)
    }
}

/// Read-only lookup of heuristic definitions by id.
pub trait HeuristicCatalog: Send + Sync {
    fn lookup(&self, heur_id: HeuristicId) -> Option<&HeuristicDefinition>;
}

/// In-memory catalog, typically built from a service manifest.
#[derive(Debug, Clone, Default)]
pub struct HeuristicTable {
    definitions: BTreeMap<HeuristicId, HeuristicDefinition>,
}

impl HeuristicTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: HeuristicDefinition) -> Option<HeuristicDefinition> {
        self.definitions.insert(definition.heur_id, definition)
    }

    pub fn with_definition(mut self, definition: HeuristicDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeuristicDefinition> {
        self.definitions.values()
    }
}

impl HeuristicCatalog for HeuristicTable {
    fn lookup(&self, heur_id: HeuristicId) -> Option<&HeuristicDefinition> {
        self.definitions.get(&heur_id)
    }
}

impl FromIterator<HeuristicDefinition> for HeuristicTable {
    fn from_iter<I: IntoIterator<Item = HeuristicDefinition>>(iter: I) -> Self {
        let mut table = Self::new();
        for definition in iter {
            table.insert(definition);
        }
        table
    }
}
