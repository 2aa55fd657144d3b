//! Finalized report
//!
//! The flat, immutable output of [`crate::ServiceResult::finalize`]. Field
//! names and order are what downstream renderers consume.

use crate::core::{BodyFormat, Classification};
use crate::heuristics::HeuristicSnapshot;
use crate::section::ResultSection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub score: i64,
    pub sections: Vec<SectionRecord>,
}

impl FinalReport {
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshot of one section at flatten time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub body: Option<String>,
    pub classification: Classification,
    pub body_format: BodyFormat,
    pub depth: usize,
    pub heuristic: Option<HeuristicSnapshot>,
    pub tags: Value,
    pub title_text: String,
    pub zeroize_on_tag_safe: bool,
    pub auto_collapse: bool,
}

impl SectionRecord {
    pub(crate) fn snapshot(section: &ResultSection) -> Self {
        Self {
            body: section.body(),
            classification: section.classification().clone(),
            body_format: section.body_format(),
            depth: section.depth(),
            heuristic: section.heuristic().map(|h| h.snapshot()),
            tags: unflatten_tags(section.tags()),
            title_text: section.title().to_string(),
            zeroize_on_tag_safe: section.zeroize_on_tag_safe(),
            auto_collapse: section.auto_collapse(),
        }
    }

    pub fn score(&self) -> i64 {
        self.heuristic.as_ref().map_or(0, |h| h.score)
    }
}

/// Groups dotted tag types into nested objects:
/// `network.static.ip` becomes `{"network": {"static": {"ip": [...]}}}`.
///
/// When a dotted prefix already holds values, the rest of the path is kept
/// as a flat key at that level.
pub fn unflatten_tags(tags: &BTreeMap<String, Vec<String>>) -> Value {
    let mut root = Map::new();
    for (tag_type, values) in tags {
        insert_path(&mut root, tag_type, Value::from(values.clone()));
    }
    Value::Object(root)
}

fn insert_path(root: &mut Map<String, Value>, tag_type: &str, value: Value) {
    let parts: Vec<&str> = tag_type.split('.').collect();
    let (last, parents) = match parts.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut node = root;
    for (i, part) in parents.iter().enumerate() {
        if node.get(*part).is_some_and(|existing| !existing.is_object()) {
            let flat_key = parts[i..].join(".");
            warn!(tag_type, key = %flat_key, "Tag type collides with a shorter tag type");
            node.insert(flat_key, value);
            return;
        }

        node = match node
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
        {
            Value::Object(map) => map,
            _ => return,
        };
    }

    node.insert(last.to_string(), value);
}
