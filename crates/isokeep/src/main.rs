//! Command-line front end.
//!
//! Points the engine at a collection root (typically a mounted Ventoy
//! drive), discovers or generates the run configuration, and reports a
//! per-title summary when the run finishes.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use isokeep_engine::{builtin_titles, Dispatcher, RunConfig, UpdateOutcome};
use isokeep_fetch::ReqwestClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = include_str!("../config.toml.default");

#[derive(Parser)]
#[command(
    name = "isokeep",
    version,
    about = "Keep a removable-media ISO collection up to date from official sources"
)]
struct Cli {
    /// Root of the collection, e.g. the mounted Ventoy drive.
    root: PathBuf,

    /// Path to the run configuration (default: ./config.toml, then
    /// <ROOT>/config.toml).
    #[arg(short = 'c', long = "config-file")]
    config_file: Option<PathBuf>,

    /// Log level when RUST_LOG is not set.
    #[arg(short = 'l', long = "log-level", default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stderr.
    #[arg(short = 'f', long = "log-file")]
    log_file: Option<PathBuf>,

    /// Maximum concurrent downloads.
    #[arg(short = 'j', long = "jobs", default_value_t = isokeep_engine::DEFAULT_CONCURRENCY)]
    jobs: usize,

    /// Resolve and report without downloading anything.
    #[arg(long)]
    dry_run: bool,
}

fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let writer = match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();
    Ok(())
}

/// Explicit flag first, then the working directory, then the drive.
fn discover_config(cli: &Cli) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = &cli.config_file {
        if !path.is_file() {
            bail!("config file {} does not exist", path.display());
        }
        return Ok(Some(path.clone()));
    }
    let local = PathBuf::from("config.toml");
    if local.is_file() {
        return Ok(Some(local));
    }
    let on_drive = cli.root.join("config.toml");
    if on_drive.is_file() {
        return Ok(Some(on_drive));
    }
    Ok(None)
}

fn print_summary(outcomes: &std::collections::BTreeMap<isokeep_engine::TaskId, UpdateOutcome>) -> usize {
    let mut failed = 0;
    println!();
    for (id, outcome) in outcomes {
        match outcome {
            UpdateOutcome::Skipped { version } => match version {
                Some(v) => println!("  up to date   {id} ({v})"),
                None => println!("  up to date   {id}"),
            },
            UpdateOutcome::WouldUpdate { version } => match version {
                Some(v) => println!("  would update {id} -> {v}"),
                None => println!("  would update {id}"),
            },
            UpdateOutcome::Committed { new, .. } => {
                println!("  updated      {id} -> {}", new.display());
            }
            UpdateOutcome::Failed { kind, message } => {
                failed += 1;
                println!("  FAILED       {id}: {kind}: {message}");
            }
        }
    }
    println!(
        "\n{} task(s), {} failed",
        outcomes.len(),
        failed
    );
    failed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    if !cli.root.is_dir() {
        bail!("{} is not a directory", cli.root.display());
    }

    let Some(config_path) = discover_config(&cli)? else {
        let target = cli.root.join("config.toml");
        std::fs::write(&target, DEFAULT_CONFIG)
            .with_context(|| format!("writing {}", target.display()))?;
        println!("No configuration found.");
        println!(
            "A default one was written to {}; edit it and run isokeep again.",
            target.display()
        );
        return Ok(());
    };
    info!(config = %config_path.display(), "using configuration");

    let catalog = builtin_titles();
    let names: Vec<String> = catalog.iter().map(|t| t.name.clone()).collect();
    let text = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config = RunConfig::parse(&text, &names)
        .with_context(|| format!("parsing {}", config_path.display()))?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling remaining tasks");
                cancel.cancel();
            }
        });
    }

    let client = Arc::new(ReqwestClient::new().context("building HTTP client")?);
    let reporter = progress::Reporter::new();
    let dispatcher = Dispatcher::new(client)
        .concurrency(cli.jobs)
        .cancel_token(cancel)
        .dry_run(cli.dry_run)
        .progress(reporter.factory());

    let outcomes = dispatcher.run_all(&config, &catalog, &cli.root).await;
    reporter.clear();

    let failed = print_summary(&outcomes);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
