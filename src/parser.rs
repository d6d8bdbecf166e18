// 🏗️ Parser Framework - Bank activity exports
// Turns a downloaded activity file into a date-sorted bank ledger

use crate::error::SyncError;
use crate::transaction::Transaction;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Header line of the Chase activity export
pub const CHASE_HEADER: &str = "Transaction Date,Post Date,Description,Category,Type,Amount,Memo";

const CHASE_FIELD_COUNT: usize = 7;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Type column of a bank export row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Sale,
    Return,
    Fee,
    /// Card payment confirmation
    Payment,
    /// Cash back and similar credits
    Adjustment,
    /// A repeated header row ("Type")
    Header,
    Unknown(String),
}

impl TransactionKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "Sale" => TransactionKind::Sale,
            "Return" => TransactionKind::Return,
            "Fee" => TransactionKind::Fee,
            "Payment" => TransactionKind::Payment,
            "Adjustment" => TransactionKind::Adjustment,
            "Type" => TransactionKind::Header,
            other => TransactionKind::Unknown(other.to_string()),
        }
    }

    /// Kinds that are dropped without a warning
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            TransactionKind::Header | TransactionKind::Payment | TransactionKind::Adjustment
        )
    }

    /// Default filter: purchases, refunds and fees belong in the ledger
    pub fn is_recordable(&self) -> bool {
        matches!(
            self,
            TransactionKind::Sale | TransactionKind::Return | TransactionKind::Fee
        )
    }
}

/// One row of the bank export, fields as written in the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankRecord {
    pub transaction_date: String,
    pub post_date: String,
    pub description: String,
    pub category: String,
    pub kind: TransactionKind,
    pub amount: String,
    pub memo: String,
    pub line_number: usize,
}

impl BankRecord {
    pub fn to_transaction(&self) -> Result<Transaction, SyncError> {
        Transaction::from_bank_fields(&self.transaction_date, &self.amount, &self.description)
            .map_err(|e| SyncError::MalformedRecord {
                line: self.line_number,
                reason: e.to_string(),
            })
    }
}

/// Parser output: the bank ledger plus non-fatal diagnostics
#[derive(Debug, Clone, Default)]
pub struct BankExport {
    /// Sorted by date, newest first; same-day rows keep file order
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<String>,
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

pub trait BankParser {
    /// Parse export content already read into memory
    fn parse_str(&self, content: &str) -> Result<BankExport>;

    /// Human-readable name for logs
    fn name(&self) -> &str;

    /// Parse an export file
    fn parse(&self, file_path: &Path) -> Result<BankExport> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        self.parse_str(&content)
            .with_context(|| format!("Failed to parse {} export {}", self.name(), file_path.display()))
    }
}

// ============================================================================
// CHASE PARSER
// ============================================================================

/// Chase credit card activity export.
///
/// The file is comma separated but descriptions are not quoted, so they may
/// contain commas. Fields are split without quote handling and the
/// description is rebuilt from everything between the two leading date
/// columns and the four trailing columns.
pub struct ChaseCsvParser {
    accept: fn(&TransactionKind) -> bool,
}

impl ChaseCsvParser {
    pub fn new() -> Self {
        ChaseCsvParser {
            accept: TransactionKind::is_recordable,
        }
    }

    /// Use a custom predicate to choose which known kinds are kept
    pub fn with_filter(accept: fn(&TransactionKind) -> bool) -> Self {
        ChaseCsvParser { accept }
    }

    /// Split the export into records without filtering
    pub fn read_records(&self, content: &str) -> Result<(Vec<BankRecord>, Vec<String>)> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(content.as_bytes());

        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut seen_header = false;

        for (index, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read CSV line {}", index + 1))?;
            let line_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 1);

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            if !seen_header {
                seen_header = true;
                let header = record.iter().collect::<Vec<_>>().join(",");
                if header.trim() != CHASE_HEADER {
                    let message =
                        "Unexpected CSV header line -- has the Chase CSV format changed?".to_string();
                    warn!("{}", message);
                    warnings.push(message);
                }
                continue;
            }

            let fields: Vec<&str> = record.iter().collect();
            if fields.len() < CHASE_FIELD_COUNT {
                return Err(SyncError::MalformedRecord {
                    line: line_number,
                    reason: format!(
                        "expected at least {} fields, found {}",
                        CHASE_FIELD_COUNT,
                        fields.len()
                    ),
                }
                .into());
            }

            let tail = fields.len() - 4;
            records.push(BankRecord {
                transaction_date: fields[0].trim().to_string(),
                post_date: fields[1].trim().to_string(),
                description: fields[2..tail].join(","),
                category: fields[tail].trim().to_string(),
                kind: TransactionKind::from_code(fields[tail + 1]),
                amount: fields[tail + 2].trim().to_string(),
                memo: fields[tail + 3].trim().to_string(),
                line_number,
            });
        }

        Ok((records, warnings))
    }
}

impl Default for ChaseCsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BankParser for ChaseCsvParser {
    fn parse_str(&self, content: &str) -> Result<BankExport> {
        let (records, mut warnings) = self.read_records(content)?;

        let mut transactions = Vec::new();
        for record in &records {
            if record.kind.is_ignored() {
                continue;
            }

            if let TransactionKind::Unknown(code) = &record.kind {
                let message = format!("Unknown CSV line type {} (line {})", code, record.line_number);
                warn!("{}", message);
                warnings.push(message);
                continue;
            }

            if !(self.accept)(&record.kind) {
                debug!(line = record.line_number, kind = ?record.kind, "Skipping filtered row");
                continue;
            }

            transactions.push(record.to_transaction()?);
        }

        // Exports are not reliably ordered; stable sort keeps same-day file order
        transactions.sort_by(|a, b| b.date().cmp(&a.date()));

        Ok(BankExport {
            transactions,
            warnings,
        })
    }

    fn name(&self) -> &str {
        "Chase"
    }
}

// ============================================================================
// TESTS
// ============================================================================
