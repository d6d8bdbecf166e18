// ⚖️ Reconciliation Engine - What does the bank know that the ledger doesn't?
//
// A bank transaction is:
//   - already recorded   when its full (date, amount, description) triple is in the ledger
//   - an amount mismatch when only its (date, description) pair is in the ledger
//   - missing            otherwise
//
// Identity is anchored on date + description, so amount mismatches are
// reported and never inserted.

use crate::transaction::{SlimKey, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Four weeks of bank history are compared by default
pub const DEFAULT_WINDOW_DAYS: i64 = 28;

// ============================================================================
// DISCREPANCY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub date: NaiveDate,
    pub description: String,
    pub bank_amount: Decimal,
    pub recorded_amount: Decimal,
    pub category: DiscrepancyCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscrepancyCategory {
    AmountMismatch,
}

impl Discrepancy {
    pub fn message(&self) -> String {
        format!(
            "[{}] {} has differing money ({} on bank export, {} recorded)",
            self.date, self.description, self.bank_amount, self.recorded_amount
        )
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Bank transactions absent from the ledger, in bank order (newest first)
    pub missing: Vec<Transaction>,
    pub discrepancies: Vec<Discrepancy>,
    /// Bank transactions inside the window
    pub considered: usize,
    /// Bank transactions found with an identical triple
    pub matched: usize,
    pub today: NaiveDate,
    pub window_days: i64,
}

impl ReconciliationReport {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Human-readable diagnostics, one per discrepancy
    pub fn warnings(&self) -> Vec<String> {
        self.discrepancies.iter().map(Discrepancy::message).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation as of {} ({} days): {} considered, {} recorded, {} amount mismatches, {} missing",
            self.today,
            self.window_days,
            self.considered,
            self.matched,
            self.discrepancies.len(),
            self.missing.len()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    /// Bank transactions older than this many days before `today` are ignored
    pub window_days: i64,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_window(window_days: i64) -> Self {
        ReconciliationEngine { window_days }
    }

    /// Is `date` inside the window ending at `today` (inclusive)?
    ///
    /// Dates after `today` are inside the window.
    pub fn in_window(&self, date: NaiveDate, today: NaiveDate) -> bool {
        (today - date).num_days() <= self.window_days
    }

    /// Compute the bank transactions that still need to be recorded.
    ///
    /// `today` is passed in rather than read from the clock so runs are
    /// reproducible. The computation is pure: calling it twice on the same
    /// inputs yields the same report.
    pub fn find_missing(
        &self,
        bank: &[Transaction],
        target: &[Transaction],
        today: NaiveDate,
    ) -> ReconciliationReport {
        let recorded: HashSet<&Transaction> = target.iter().collect();

        // First recorded amount per (date, description)
        let mut recorded_slim: HashMap<SlimKey<'_>, Decimal> = HashMap::new();
        for tx in target {
            recorded_slim.entry(tx.slim_key()).or_insert(tx.amount());
        }

        let mut missing = Vec::new();
        let mut discrepancies = Vec::new();
        let mut considered = 0;
        let mut matched = 0;

        for tx in bank.iter().filter(|tx| self.in_window(tx.date(), today)) {
            considered += 1;

            if recorded.contains(tx) {
                matched += 1;
                continue;
            }

            if let Some(recorded_amount) = recorded_slim.get(&tx.slim_key()) {
                let discrepancy = Discrepancy {
                    date: tx.date(),
                    description: tx.description().to_string(),
                    bank_amount: tx.amount(),
                    recorded_amount: *recorded_amount,
                    category: DiscrepancyCategory::AmountMismatch,
                };
                warn!("{}", discrepancy.message());
                discrepancies.push(discrepancy);
                continue;
            }

            debug!(transaction = %tx, "Missing from ledger");
            missing.push(tx.clone());
        }

        ReconciliationReport {
            missing,
            discrepancies,
            considered,
            matched,
            today,
            window_days: self.window_days,
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
