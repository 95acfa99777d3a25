mod analysis;
mod batch;
mod config;
mod data;
mod error;
mod export;
mod ruct;
mod signal;
mod store;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use config::{Config, FailurePolicy};
use export::{ExportFormat, ensure_writable, write_table};
use store::RecordStore;

/// Analyse wood-cutting recordings: force statistics over the cutting
/// window and the real uncut chip thickness of every file.
#[derive(Debug, Parser)]
#[command(name = "rusty-chips", version, about)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the recordings (overrides the config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Results table; defaults to `<root>/results.<format>`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,

    /// Analyse files on all cores.
    #[arg(long)]
    parallel: bool,

    /// Abort on the first failing file.
    #[arg(long)]
    fail_fast: bool,

    /// Write peaks, events and ranges of every file as JSON into this folder
    /// (overrides the config).
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Replace existing results.
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if cli.parallel {
        config.batch.parallel = true;
    }
    if cli.fail_fast {
        config.batch.on_failure = FailurePolicy::FailFast;
    }
    if let Some(dir) = &cli.diagnostics {
        config.batch.diagnostics_dir = Some(dir.clone());
    }
    config.validate().context("invalid configuration")?;

    info!(
        "rusty-chips {}: analysing {} (config: {})",
        env!("CARGO_PKG_VERSION"),
        config.root.display(),
        cli.config
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string())
    );

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| config.root.join(format!("results.{}", cli.format.extension())));
    ensure_writable(&output, cli.overwrite)?;
    if let Some(dir) = &config.batch.diagnostics_dir {
        ensure_writable(dir, cli.overwrite)?;
    }

    let files = batch::list_recordings(&config.root, &config.extension)?;
    if files.is_empty() {
        bail!(
            "no .{} recordings found in {}",
            config.extension,
            config.root.display()
        );
    }
    info!("{} recordings found", files.len());

    let store = RecordStore::default();
    let summary = batch::run_batch(&config, &files, &store)?;

    let rows = store.into_rows();
    if log::log_enabled!(log::Level::Debug) {
        log::debug!("results:\n{}", export::preview(&rows)?);
    }
    write_table(&output, &rows, cli.format)?;
    info!(
        "{} of {} files analysed, results written to {}",
        summary.processed,
        files.len(),
        output.display()
    );

    if !summary.failed.is_empty() {
        for (file, reason) in &summary.failed {
            log::error!("{file}: {reason}");
        }
        bail!("{} file(s) could not be analysed", summary.failed.len());
    }
    Ok(())
}
