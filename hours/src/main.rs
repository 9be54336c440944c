use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hours::processor::{LogProcessor, ProcessedLog};
use hours::storage::{FileLogStore, LogStore};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "hours",
    about = "Resolve the hours of a Markdown work log and rewrite its monthly summary",
    version
)]
struct Cli {
    /// The Markdown file to process.
    file_path: PathBuf,
    /// Folder to store the backups.
    #[arg(
        short = 'b',
        long = "backup-folder",
        visible_alias = "backup_folder",
        default_value = "log_backups"
    )]
    backup_folder: PathBuf,
    /// Shows all the DEBUG level logging messages.
    #[arg(short, long)]
    debug: bool,
    /// Print the rewritten document instead of saving it.
    #[arg(long)]
    dry_run: bool,
    /// Print the per-period totals as JSON.
    #[arg(long)]
    json: bool,
}

/// What a run did to the file.
#[derive(Debug, PartialEq)]
enum Outcome {
    Saved { backup: PathBuf },
    Unchanged,
    DryRun,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match run(&cli)? {
        Outcome::Saved { backup } => info!("Previous version kept at {}", backup.display()),
        outcome => debug!("Finished: {:?}", outcome),
    }
    Ok(())
}

/// `RUST_LOG` applies unless `--debug` is given.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if debug {
        info!("Showing all the DEBUG level logging messages");
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    let store = FileLogStore::open(&cli.file_path, &cli.backup_folder)?;
    let processor = LogProcessor::new();
    let lines = store.load()?;
    let processed = processor
        .process(&lines)
        .with_context(|| format!("processing {:?}", store.file_path()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&processed.report())?);
    }

    if cli.dry_run {
        if !cli.json {
            print!("{}", processed.lines.concat());
        }
        return Ok(Outcome::DryRun);
    }

    persist(&store, processed)
}

fn persist(store: &impl LogStore, processed: ProcessedLog) -> Result<Outcome> {
    if !processed.has_changed() {
        info!("No changes to process");
        return Ok(Outcome::Unchanged);
    }
    let backup = store.save(&processed.into_lines())?;
    Ok(Outcome::Saved { backup })
}
