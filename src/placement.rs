// 📍 Placement Planner - Where does each new row go?
//
// The ledger is newest-first. A missing transaction belongs directly above the
// first ledger row that the bank export lists *after* it. Bank order, not a
// date comparison, decides this, because several transactions can share a
// date and only the bank knows their relative order.
//
// Cost: each lookup scans the bank ledger and the target ledger once, so a
// batch of n missing transactions is O(n * (bank + target)). Ledgers hold
// hundreds of rows, so no index is built.

use crate::error::{SyncError, SyncResult};
use crate::transaction::{SlimKey, Transaction};
use std::collections::HashSet;

/// Raw insertion row for `transaction`, relative to the ledger's data region.
///
/// Returns the index of the first target row whose (date, description) is
/// listed in the bank ledger after `transaction`, or `target.len()` when no
/// such row exists. The bank position is found by full-triple identity; the
/// first occurrence wins.
pub fn row_index_for(
    transaction: &Transaction,
    bank: &[Transaction],
    target: &[Transaction],
) -> SyncResult<usize> {
    let position = bank
        .iter()
        .position(|tx| tx == transaction)
        .ok_or_else(|| SyncError::NotInBankLedger {
            date: transaction.date(),
            description: transaction.description().to_string(),
        })?;

    let older: HashSet<SlimKey<'_>> = bank[position + 1..].iter().map(Transaction::slim_key).collect();

    Ok(target
        .iter()
        .position(|row| older.contains(&row.slim_key()))
        .unwrap_or(target.len()))
}

/// Plans row indices for a batch computed from one ledger snapshot
pub struct PlacementPlanner<'a> {
    bank: &'a [Transaction],
    target: &'a [Transaction],
}

impl<'a> PlacementPlanner<'a> {
    pub fn new(bank: &'a [Transaction], target: &'a [Transaction]) -> Self {
        PlacementPlanner { bank, target }
    }

    pub fn raw_index(&self, transaction: &Transaction) -> SyncResult<usize> {
        row_index_for(transaction, self.bank, self.target)
    }

    /// Row index for each transaction, in batch order.
    ///
    /// Every earlier insertion pushes later rows down by one, so the n-th
    /// item (0-based) is shifted by n. Rows must be inserted in this order.
    pub fn plan(&self, batch: &[Transaction]) -> SyncResult<Vec<usize>> {
        batch
            .iter()
            .enumerate()
            .map(|(inserted_before, tx)| self.raw_index(tx).map(|row| row + inserted_before))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
