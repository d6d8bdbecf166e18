// 🧾 Transaction Normalizer - Canonical (date, amount, description) triples
// Both ledgers are reduced to this shape before any comparison happens.

use crate::error::{SyncError, SyncResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used by the bank activity export ("01/10/2024")
pub const BANK_DATE_FORMAT: &str = "%m/%d/%Y";

/// Date format used by the ledger ("January 10, 2024")
pub const LEDGER_DATE_FORMAT: &str = "%B %d, %Y";

// ============================================================================
// TRANSACTION
// ============================================================================

/// Immutable transaction value.
///
/// Equality and hashing cover the full triple. Use [`Transaction::slim_key`]
/// when the amount must be ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    date: NaiveDate,
    amount: Decimal,
    description: String,
}

/// (date, description) identity, ignoring the amount
pub type SlimKey<'a> = (NaiveDate, &'a str);

impl Transaction {
    /// Build a transaction, normalizing the description
    pub fn new(date: NaiveDate, amount: Decimal, description: &str) -> Self {
        Transaction {
            date,
            amount,
            description: normalize_description(description),
        }
    }

    /// Parse a row of the bank activity export
    pub fn from_bank_fields(date: &str, amount: &str, description: &str) -> SyncResult<Self> {
        Ok(Transaction::new(
            parse_date(date, BANK_DATE_FORMAT)?,
            parse_amount(amount)?,
            description,
        ))
    }

    /// Parse a row of the ledger ("January 10, 2024", "$1,234.56", text)
    pub fn from_ledger_fields(date: &str, amount: &str, description: &str) -> SyncResult<Self> {
        Ok(Transaction::new(
            parse_date(date, LEDGER_DATE_FORMAT)?,
            parse_amount(amount)?,
            description,
        ))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn slim_key(&self) -> SlimKey<'_> {
        (self.date, self.description.as_str())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.date, self.description, self.amount)
    }
}

// ============================================================================
// FIELD NORMALIZATION
// ============================================================================

/// Decode the escaped ampersand, collapse whitespace runs and trim
pub fn normalize_description(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an exact decimal amount, tolerating "$" and thousands separators
pub fn parse_amount(raw: &str) -> SyncResult<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();

    Decimal::from_str(&cleaned).map_err(|_| SyncError::InvalidAmount {
        value: raw.to_string(),
    })
}

/// Parse a calendar date with the given chrono format
pub fn parse_date(raw: &str, format: &'static str) -> SyncResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), format).map_err(|_| SyncError::InvalidDate {
        value: raw.to_string(),
        expected: format,
    })
}

// ============================================================================
// TESTS
// ============================================================================
