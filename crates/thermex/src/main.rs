// crates/thermex/src/main.rs

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use thermex_core::{process_directory, PipelineError, RunOutcome, RunSummary, ThermexConfig};
use tracing_subscriber::EnvFilter;

/// Corrects and archives new dilatometer exports in one directory.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory to process. Prompted for when omitted.
    directory: Option<PathBuf>,

    /// TOML file overriding the default naming conventions.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json);

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

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ThermexConfig::load(path)?,
        None => ThermexConfig::from_env()?,
    };

    let directory = match cli.directory {
        Some(directory) => directory,
        None => prompt_for_directory()?,
    };
    if !directory.is_dir() {
        bail!("{} is not a directory", directory.display());
    }

    match process_directory(&directory, &config)? {
        RunOutcome::UpToDate => println!("Folder is up to date."),
        RunOutcome::Processed(summary) => print_summary(&summary),
    }
    Ok(())
}

fn prompt_for_directory() -> Result<PathBuf> {
    print!("Data directory: ");
    io::stdout().flush().context("failed to flush prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read directory from stdin")?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        bail!("no directory given");
    }
    Ok(Path::new(trimmed).to_path_buf())
}

fn print_summary(summary: &RunSummary) {
    println!("Processed {}", summary.directory.display());
    if let Some(sample) = &summary.calibration_sample {
        println!("  standard fitted from {sample}");
    }
    for file in &summary.processed {
        println!(
            "  {} -> {}, {} ({} rows)",
            file.source, file.outputs.metadata_file, file.outputs.data_file, file.rows
        );
    }
    println!("  {} ledger entries added", summary.ledger_entries.len());
}
