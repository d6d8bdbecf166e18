// 🔄 Sync Run - Load everything a run needs and build its plan
// Nothing is written here; committing the plan is the sink's job.

use crate::config::{find_bank_export, Config};
use crate::ledger::LedgerFile;
use crate::parser::{BankParser, ChaseCsvParser};
use crate::plan::SyncPlan;
use crate::reconciliation::ReconciliationEngine;
use crate::rules::RuleEngine;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::info;

pub struct SyncRun {
    pub plan: SyncPlan,
    /// Ledger snapshot the plan was computed against
    pub ledger: LedgerFile,
    pub export_path: PathBuf,
}

impl SyncRun {
    /// Read rules, bank export and ledger, then reconcile as of `today`
    pub fn prepare(config: &Config, today: NaiveDate) -> Result<Self> {
        let rules = match &config.rules_path {
            Some(path) => RuleEngine::from_file(path)?,
            None => RuleEngine::default(),
        };
        info!("Loaded {} classification rules", rules.rule_count());

        let export_path = find_bank_export(&config.download_dir, &config.export_prefix())?;
        let export = ChaseCsvParser::new().parse(&export_path)?;
        info!(
            "Read {} transactions from {}",
            export.transactions.len(),
            export_path.display()
        );

        let ledger = LedgerFile::read(&config.ledger_path, config.header_rows)?;
        let target = ledger
            .transactions()
            .with_context(|| format!("Invalid ledger row in {}", config.ledger_path.display()))?;

        let mut earlier_warnings = config.warnings();
        earlier_warnings.extend(rules.rejected().iter().cloned());
        earlier_warnings.extend(export.warnings);

        let engine = ReconciliationEngine::with_window(config.window_days);
        let plan = SyncPlan::build(&export.transactions, &target, &rules, &engine, today)?
            .with_warnings(earlier_warnings);

        Ok(SyncRun {
            plan,
            ledger,
            export_path,
        })
    }
}
