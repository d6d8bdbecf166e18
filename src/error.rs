// 🚨 Error Types - Typed failures raised by the reconciliation core
// Adapters wrap these in anyhow::Error with file/line context.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Date text did not match the expected format
    #[error("cannot parse date '{value}' (expected {expected})")]
    InvalidDate { value: String, expected: &'static str },

    /// Amount text is not an exact decimal
    #[error("cannot parse amount '{value}'")]
    InvalidAmount { value: String },

    /// A record does not have the shape the adapter expects
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A missing transaction could not be located in the bank ledger.
    /// Only reachable through a programming error upstream.
    #[error("transaction [{date}] {description} is not present in the bank ledger")]
    NotInBankLedger { date: NaiveDate, description: String },

    #[error("invalid classification rule: {0}")]
    InvalidRule(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
