use anyhow::Result;
use assay_results::ServiceManifest;
use colored::*;
use std::path::Path;

pub fn execute(manifest: &Path) -> Result<()> {
    let manifest = ServiceManifest::from_file(manifest)?.with_env_overrides();

    println!(
        "{} {} v{}",
        "Service:".bright_blue().bold(),
        manifest.name,
        manifest.version
    );
    println!(
        "Default classification: {}",
        manifest.default_result_classification
    );

    if manifest.heuristics.is_empty() {
        println!("No heuristics declared");
        return Ok(());
    }

    println!(
        "\n{}",
        format!("{:>6}  {:<32} {:>6} {:>6}  ATT&CK", "ID", "NAME", "SCORE", "MAX").bold()
    );
    for definition in &manifest.heuristics {
        let max_score = definition
            .effective_max_score()
            .map_or_else(|| "-".to_string(), |max| max.to_string());
        println!(
            "{:>6}  {:<32} {:>6} {:>6}  {}",
            definition.heur_id,
            definition.name,
            definition.score,
            max_score,
            definition.attack_id.join(", ")
        );
    }

    Ok(())
}
