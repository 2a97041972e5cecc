use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use thermex_core::catalog::build_catalog;
use thermex_core::collect::collect_outputs;
use thermex_core::{PipelineError, ThermexConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Thermex collection tooling", long_about = None)]
struct Cli {
    /// TOML file overriding the default naming conventions.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy corrected data files from every leaf directory up into ROOT
    Collect(RootArgs),
    /// List collected files grouped by sample, orientation and run
    Catalog(RootArgs),
}

#[derive(Args, Debug)]
struct RootArgs {
    /// Root of the data tree
    root: PathBuf,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ThermexConfig::load(path)?,
        None => ThermexConfig::from_env()?,
    };

    match cli.command {
        Command::Collect(args) => handle_collect(&args.root, &config),
        Command::Catalog(args) => handle_catalog(&args.root),
    }
}

fn handle_collect(root: &Path, config: &ThermexConfig) -> Result<()> {
    let today = Local::now().date_naive();
    let summary = collect_outputs(root, config, today)
        .with_context(|| format!("collecting outputs under {}", root.display()))?;

    info!(snapshot = %summary.snapshot.display(), "collection finished");
    println!("Snapshot written to {}", summary.snapshot.display());
    println!(
        "{} files listed in {} directories, {} copied",
        summary.listed(),
        summary.listing.len(),
        summary.copied.len()
    );
    for name in &summary.copied {
        println!("  copied {name}");
    }
    Ok(())
}

fn handle_catalog(root: &Path) -> Result<()> {
    let entries = build_catalog(root)
        .with_context(|| format!("reading catalog from {}", root.display()))?;
    if entries.is_empty() {
        println!("No corrected data files found in {}", root.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Sample", "Orientation", "Run", "File"]);
    for entry in &entries {
        table.add_row(vec![
            entry.sample.as_str(),
            entry.orientation.as_str(),
            entry.run.as_str(),
            entry.file.as_str(),
        ]);
    }
    println!("{table}");
    Ok(())
}
