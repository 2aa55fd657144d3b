use crate::core::classification::DEFAULT_CLASSIFICATION;
use crate::heuristics::{HeuristicDefinition, HeuristicTable};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the manifest's default classification.
pub const CLASSIFICATION_ENV: &str = "ASSAY_DEFAULT_CLASSIFICATION";

/// The parts of a service manifest a result needs: its identity, the default
/// result classification and the heuristic catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceManifest {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_result_classification")]
    pub default_result_classification: String,

    #[serde(default)]
    pub heuristics: Vec<HeuristicDefinition>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}
fn default_result_classification() -> String {
    DEFAULT_CLASSIFICATION.to_string()
}

impl Default for ServiceManifest {
    fn default() -> Self {
        Self {
            name: "assay".to_string(),
            version: default_version(),
            default_result_classification: default_result_classification(),
            heuristics: Vec::new(),
        }
    }
}

impl ServiceManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
        Ok(manifest)
    }

    /// Loads JSON for a `.json` extension and YAML otherwise.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(content)?;
        Ok(manifest)
    }

    /// Default manifest with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(classification) = std::env::var(CLASSIFICATION_ENV) {
            let classification = classification.trim();
            if !classification.is_empty() {
                self.default_result_classification = classification.to_string();
            }
        }
        self
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn heuristic_table(&self) -> HeuristicTable {
        self.heuristics.iter().cloned().collect()
    }
}

pub const EXAMPLE_MANIFEST: &str = r#"
# Service manifest

name: PeInspector
version: 4.5.0
default_result_classification: TLP:C

heuristics:
  - heur_id: 1
    name: Packed executable
    score: 100
    filetype: executable/windows
    description: The file uses a known packer
    attack_id: T1027

  - heur_id: 2
    name: Process injection
    score: 500
    max_score: 1000
    filetype: executable/windows
    description: Imports commonly used for process injection
    attack_id:
      - T1055
      - T1106
    signature_score_map:
      create_remote_thread: 250
      write_process_memory: 200

  - heur_id: 3
    name: Suspicious string
    score: 10
    filetype: "*"
    description: Strings associated with malicious tooling
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::HeuristicCatalog;
    use std::io::Write;

    #[test]
    fn test_example_manifest_parses() {
        let manifest = ServiceManifest::from_yaml_str(EXAMPLE_MANIFEST).unwrap();
        assert_eq!(manifest.name, "PeInspector");
        assert_eq!(manifest.heuristics.len(), 3);

        let table = manifest.heuristic_table();
        let injection = table.lookup(2).unwrap();
        assert_eq!(injection.attack_id, vec!["T1055", "T1106"]);
        assert_eq!(injection.max_score, Some(1000));
        assert_eq!(injection.signature_score_map["create_remote_thread"], 250);

        assert_eq!(table.lookup(1).unwrap().attack_id, vec!["T1027"]);
        assert_eq!(table.lookup(3).unwrap().filetype, "*");
    }

    #[test]
    fn test_defaults() {
        let manifest = ServiceManifest::from_yaml_str("name: Minimal\n").unwrap();
        assert_eq!(manifest.default_result_classification, "TLP:C");
        assert_eq!(manifest.version, "1.0.0");
        assert!(manifest.heuristic_table().is_empty());
    }

    #[test]
    fn test_save_and_reload_json() {
        let manifest = ServiceManifest::from_yaml_str(EXAMPLE_MANIFEST).unwrap();
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        manifest.save_json(file.path()).unwrap();

        let reloaded = ServiceManifest::from_file(file.path()).unwrap();
        assert_eq!(reloaded.heuristics.len(), 3);
        assert_eq!(reloaded.heuristic_table().lookup(2).unwrap().score, 500);
    }

    #[test]
    fn test_save_and_reload_yaml() {
        let mut manifest = ServiceManifest::from_yaml_str(EXAMPLE_MANIFEST).unwrap();
        manifest.default_result_classification = "TLP:AMBER".to_string();
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        manifest.save_yaml(file.path()).unwrap();

        let reloaded = ServiceManifest::from_file(file.path()).unwrap();
        assert_eq!(reloaded.name, "PeInspector");
        assert_eq!(reloaded.default_result_classification, "TLP:AMBER");
        assert_eq!(reloaded.heuristic_table().lookup(1).unwrap().attack_id, vec!["T1027"]);
    }

    #[test]
    fn test_from_env_overrides_classification() {
        std::env::set_var(CLASSIFICATION_ENV, " TLP:RED ");
        let manifest = ServiceManifest::from_env().unwrap();
        std::env::remove_var(CLASSIFICATION_ENV);

        assert_eq!(manifest.default_result_classification, "TLP:RED");
        assert!(manifest.heuristics.is_empty());
    }

    #[test]
    fn test_yaml_file_errors_carry_path() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "heuristics: [").unwrap();

        let err = ServiceManifest::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse manifest"));
    }
}
