//! Declarative result documents
//!
//! A YAML or JSON description of a result tree. Building a document drives
//! the same public API a service would call, so a document finalizes to
//! exactly the report the equivalent code would produce.
//!
//! Image bodies have no document form: registering an attachment needs the
//! platform's registrar.

use crate::body::{
    GraphBody, JsonBody, KeyValueBody, KvValue, MemoryDumpBody, MultiBody, ProcessItem,
    ProcessTreeBody, SectionBody, TableBody, TableRow, UrlBody, UrlEntry,
};
use crate::core::{ResultContext, ResultError};
use crate::heuristics::{Heuristic, HeuristicId, HeuristicOptions};
use crate::result::ServiceResult;
use crate::section::{HeuristicSlot, ParentRef, SectionBuilder, SectionId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultDocument {
    #[serde(default)]
    pub sections: Vec<SectionDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDocument {
    #[serde(alias = "title_text")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyDocument>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heuristic: Option<HeuristicDocument>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub zeroize_on_tag_safe: bool,

    #[serde(default)]
    pub auto_collapse: bool,

    #[serde(default = "default_zeroize_on_sig_safe")]
    pub zeroize_on_sig_safe: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsections: Vec<SectionDocument>,
}

/// A body, tagged by its format name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyDocument {
    Text {
        #[serde(default)]
        lines: Vec<String>,
    },
    MemoryDump {
        data: String,
    },
    GraphData {
        cmap_min: i64,
        cmap_max: i64,
        values: Vec<i64>,
    },
    Url {
        urls: Vec<UrlEntry>,
    },
    KeyValue {
        items: Map<String, Value>,
    },
    Json {
        value: Value,
    },
    ProcessTree {
        processes: Vec<ProcessItem>,
    },
    Table {
        rows: Vec<TableRow>,
    },
    Multi {
        parts: Vec<BodyDocument>,
    },
}

/// A heuristic entry. Anything that does not have the heuristic shape is
/// kept as-is and ignored with a warning when the section is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeuristicDocument {
    Spec(HeuristicSpec),
    Other(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeuristicSpec {
    pub heur_id: HeuristicId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attack_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<SignatureHit>,

    #[serde(default = "default_frequency")]
    pub frequency: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureHit {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,

    #[serde(default = "default_frequency")]
    pub frequency: i64,
}

fn default_zeroize_on_sig_safe() -> bool {
    true
}
fn default_frequency() -> i64 {
    1
}

impl ResultDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let document: Self = serde_yaml::from_str(content)?;
        Ok(document)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(content)?;
        Ok(document)
    }

    /// Loads JSON for a `.json` extension and YAML otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read result document {}", path.display()))?;

        let document = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        };
        document.with_context(|| format!("Failed to parse result document {}", path.display()))
    }

    /// Builds an unfinalized result with every top-level section attached.
    pub fn build(&self, ctx: Arc<ResultContext>) -> Result<ServiceResult, ResultError> {
        let mut result = ServiceResult::new(ctx);
        for section in &self.sections {
            section.build(&mut result, ParentRef::Result)?;
        }
        Ok(result)
    }
}

impl SectionDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            classification: None,
            heuristic: None,
            tags: BTreeMap::new(),
            zeroize_on_tag_safe: false,
            auto_collapse: false,
            zeroize_on_sig_safe: default_zeroize_on_sig_safe(),
            subsections: Vec::new(),
        }
    }

    fn build(&self, result: &mut ServiceResult, parent: ParentRef) -> Result<SectionId, ResultError> {
        let ctx = Arc::clone(result.context());

        let mut builder = SectionBuilder::new(&self.title)
            .tags(self.tags.clone())
            .zeroize_on_tag_safe(self.zeroize_on_tag_safe)
            .auto_collapse(self.auto_collapse)
            .zeroize_on_sig_safe(self.zeroize_on_sig_safe)
            .parent(parent);

        if let Some(classification) = &self.classification {
            builder = builder.classification(classification.as_str());
        }
        if let Some(body) = &self.body {
            builder = builder.section_body(body.to_section_body(&ctx)?);
        }
        if let Some(heuristic) = &self.heuristic {
            builder = builder.heuristic(heuristic.to_slot(&ctx)?);
        }

        let id = result.create_section(builder)?;
        for subsection in &self.subsections {
            subsection.build(result, ParentRef::Section(id))?;
        }
        Ok(id)
    }
}

impl BodyDocument {
    pub fn to_section_body(&self, ctx: &ResultContext) -> Result<SectionBody, ResultError> {
        let body = match self {
            Self::Text { lines } => {
                let mut text = ctx.text_body();
                for line in lines {
                    text.add_line(line);
                }
                text.into()
            }
            Self::MemoryDump { data } => MemoryDumpBody::new().with_text(data.as_str()).into(),
            Self::GraphData {
                cmap_min,
                cmap_max,
                values,
            } => {
                let mut graph = GraphBody::new();
                graph.set_colormap(*cmap_min, *cmap_max, values.clone());
                graph.into()
            }
            Self::Url { urls } => {
                let mut body = UrlBody::new();
                for entry in urls {
                    body.add_url(entry.url.as_str(), entry.name.as_deref());
                }
                body.into()
            }
            Self::KeyValue { items } => {
                let mut body = KeyValueBody::new();
                for (key, value) in items {
                    let value = KvValue::try_from(value.clone()).map_err(|rejected| {
                        ResultError::InvalidDocument(format!(
                            "KEY_VALUE item '{key}' must be a string, integer or boolean, got {rejected}"
                        ))
                    })?;
                    body.set_item(key.as_str(), value);
                }
                body.into()
            }
            Self::Json { value } => {
                let mut body = JsonBody::new();
                body.set_json(value.clone());
                body.into()
            }
            Self::ProcessTree { processes } => {
                let mut body = ProcessTreeBody::new();
                for process in processes {
                    body.add_process(process);
                }
                body.into()
            }
            Self::Table { rows } => {
                let mut body = TableBody::new();
                for row in rows {
                    body.add_row(row.clone());
                }
                body.into()
            }
            Self::Multi { parts } => {
                let mut body = MultiBody::new();
                for part in parts {
                    body.add_section_body(&part.to_section_body(ctx)?);
                }
                body.into()
            }
        };
        Ok(body)
    }
}

impl HeuristicDocument {
    /// Fails with `InvalidHeuristic` when the id is not in the catalog.
    fn to_slot(&self, ctx: &ResultContext) -> Result<HeuristicSlot, ResultError> {
        let spec = match self {
            Self::Spec(spec) => spec,
            Self::Other(value) => return Ok(HeuristicSlot::Invalid(value.to_string())),
        };

        let options = HeuristicOptions::new()
            .with_attack_ids(spec.attack_ids.iter().cloned())
            .with_frequency(spec.frequency);
        let mut heuristic = Heuristic::with_options(ctx, spec.heur_id, options)?;
        for hit in &spec.signatures {
            heuristic.add_signature_id(hit.name.as_str(), hit.score, hit.frequency);
        }

        Ok(HeuristicSlot::Valid(heuristic))
    }
}

pub const EXAMPLE_DOCUMENT: &str = r#"
sections:
  - title: Packer detected
    heuristic:
      heur_id: 1
    tags:
      file.pe.sections.name: [UPX0, UPX1]
    body:
      format: TEXT
      lines:
        - Section UPX0 has no raw data
        - Section UPX1 has entropy 7.9
    subsections:
      - title: Injection imports
        heuristic:
          heur_id: 2
          signatures:
            - name: create_remote_thread
            - name: write_process_memory
              frequency: 2
        body:
          format: KEY_VALUE
          items:
            CreateRemoteThread: true
            WriteProcessMemory: 2
  - title: Network indicators
    tags:
      network.static.ip: [10.0.0.1]
      network.static.domain: [example.com]
    body:
      format: URL
      urls:
        - url: http://example.com/payload
          name: payload
"#;
