use anyhow::{Context, Result};
use assay_results::{AttackMap, FinalReport, ResultContext, ResultDocument, ServiceManifest};
use clap::{Args, ValueEnum};
use colored::*;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct FinalizeArgs {
    /// Service manifest (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Result document to build
    #[arg(short, long)]
    pub input: PathBuf,

    /// Known and revoked attack identifiers
    #[arg(long)]
    pub attack_map: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Json,
    Summary,
}

pub fn execute(args: &FinalizeArgs) -> Result<()> {
    let manifest = ServiceManifest::from_file(&args.manifest)?.with_env_overrides();
    debug!(
        service = %manifest.name,
        heuristics = manifest.heuristics.len(),
        "Loaded manifest"
    );

    let attack_map = match &args.attack_map {
        Some(path) => AttackMap::from_file(path)?,
        None => AttackMap::default(),
    };

    let ctx = ResultContext::from_manifest(&manifest, attack_map).into_shared();
    let document = ResultDocument::from_file(&args.input)?;

    let mut result = document
        .build(ctx)
        .with_context(|| format!("Failed to build result from {}", args.input.display()))?;
    let report = result.finalize().context("Failed to finalize result")?;

    let rendered = match args.format {
        OutputFormat::Json => report.to_json_pretty()?,
        OutputFormat::Summary => render_summary(&report),
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", rendered.trim_end()),
    }

    Ok(())
}

fn render_summary(report: &FinalReport) -> String {
    let mut out = format!(
        "{} {} sections, total score {}\n",
        "Result:".bold(),
        report.section_count(),
        score_label(report.score)
    );

    for record in &report.sections {
        let indent = "  ".repeat(record.depth + 1);
        let heuristic = match &record.heuristic {
            Some(h) => format!(" heuristic {} scored {}", h.heur_id, h.score),
            None => String::new(),
        };
        out.push_str(&format!(
            "{indent}{} {}{}\n",
            format!("[{}]", record.body_format).dimmed(),
            record.title_text,
            heuristic.yellow()
        ));
    }

    out
}

fn score_label(score: i64) -> ColoredString {
    let label = score.to_string();
    match score {
        s if s >= 1000 => label.bright_red().bold(),
        s if s >= 100 => label.yellow().bold(),
        _ => label.green(),
    }
}
