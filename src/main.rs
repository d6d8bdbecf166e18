use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ledger_sync::{format_ledger_date, Config, CsvLedgerSink, JsonPlanSink, LedgerSink, SyncRun};

/// Add new bank transactions to the ledger, newest first
#[derive(Debug, Parser)]
#[command(name = "ledger-sync", author, version, about, long_about = None)]
struct Args {
    /// Path to config.json
    #[arg(short = 'c', long = "config", default_value = "config.json")]
    config: PathBuf,

    /// Reconcile as of this date instead of today (YYYY-MM-DD)
    #[arg(long = "today")]
    today: Option<NaiveDate>,

    /// Print the insertion plan as JSON and leave the ledger untouched
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Keep the bank export after a successful import
    #[arg(long = "keep-export")]
    keep_export: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::from_file(&args.config)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let run = SyncRun::prepare(&config, today)?;
    let plan = &run.plan;

    if !plan.warnings.is_empty() {
        warn!("{} warnings during reconciliation", plan.warnings.len());
    }

    if args.dry_run {
        JsonPlanSink::new(io::stdout().lock()).apply(&plan.instructions)?;
        return Ok(());
    }

    match plan.oldest_date() {
        Some(oldest) => {
            info!("Adding {} new transactions", plan.len());
            CsvLedgerSink::new(run.ledger).apply(&plan.instructions)?;
            info!("Success! Oldest added day is: {}", format_ledger_date(oldest));
        }
        None => info!("No new transactions to add"),
    }

    if config.delete_export && !args.keep_export {
        fs::remove_file(&run.export_path)
            .with_context(|| format!("Failed to remove {}", run.export_path.display()))?;
        info!("Removed {}", run.export_path.display());
    }

    Ok(())
}
