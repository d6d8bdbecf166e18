// Ledger Sync - Core Library
// Finds bank transactions missing from a newest-first ledger and plans where to insert them

pub mod config;
pub mod error;
pub mod ledger;
pub mod parser;
pub mod placement;
pub mod plan;
pub mod reconciliation;
pub mod rules;
pub mod sync;
pub mod transaction;

// Re-export commonly used types
pub use config::{find_bank_export, Config};
pub use error::{SyncError, SyncResult};
pub use ledger::{
    format_ledger_amount, format_ledger_date, CsvLedgerSink, JsonPlanSink, LedgerFile, LedgerSink,
    LEDGER_COLUMNS,
};
pub use parser::{BankExport, BankParser, BankRecord, ChaseCsvParser, TransactionKind};
pub use placement::{row_index_for, PlacementPlanner};
pub use plan::{InsertionInstruction, SyncPlan};
pub use reconciliation::{
    Discrepancy, DiscrepancyCategory, ReconciliationEngine, ReconciliationReport,
    DEFAULT_WINDOW_DAYS,
};
pub use rules::{quarter_label, ClassificationRule, MatchKind, QuarterMode, RuleEngine};
pub use sync::SyncRun;
pub use transaction::{normalize_description, parse_amount, SlimKey, Transaction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
