use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::finalize::FinalizeArgs;

#[derive(Parser)]
#[command(name = "assay")]
#[command(about = "Build, finalize and inspect scan results")]
#[command(version = "0.2.0")]
#[command(author = "Assay Team")]
struct Cli {
    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a result from a document, finalize it and print the report
    Finalize(FinalizeArgs),

    /// List the heuristics declared in a service manifest
    Heuristics {
        #[arg(short, long)]
        manifest: PathBuf,
    },

    /// Print an example service manifest
    ExampleManifest,

    /// Print an example result document
    ExampleDocument,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Finalize(args) => commands::finalize::execute(&args),
        Commands::Heuristics { manifest } => commands::heuristics::execute(&manifest),
        Commands::ExampleManifest => {
            println!("{}", assay_results::manifest::EXAMPLE_MANIFEST.trim_start());
            Ok(())
        }
        Commands::ExampleDocument => {
            println!("{}", assay_results::document::EXAMPLE_DOCUMENT.trim_start());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
