// 🧩 Sync Plan - Reconcile, place and classify in one pass
// Produces the ordered insertion instructions a ledger sink applies.

use crate::error::SyncResult;
use crate::placement::PlacementPlanner;
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::rules::RuleEngine;
use crate::transaction::Transaction;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// INSERTION INSTRUCTION
// ============================================================================

/// One row to insert into the ledger.
///
/// `row_index` already accounts for the instructions before it in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionInstruction {
    pub row_index: usize,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    /// "<year> Q<n>" for rules in Auto quarter mode, empty otherwise
    #[serde(default)]
    pub quarter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

impl InsertionInstruction {
    /// Annotate `transaction` with the rule that matches its description
    pub fn new(row_index: usize, transaction: &Transaction, rules: &RuleEngine) -> Self {
        let rule = rules.find(transaction.description());

        InsertionInstruction {
            row_index,
            date: transaction.date(),
            amount: transaction.amount(),
            description: transaction.description().to_string(),
            quarter: rule
                .map(|r| r.quarter_label(transaction.date()))
                .unwrap_or_default(),
            category: rule.map(|r| r.category().to_string()),
            subcategory: rule
                .map(|r| r.subcategory())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_classified(&self) -> bool {
        self.category.is_some()
    }
}

// ============================================================================
// SYNC PLAN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Apply in order; later indices assume earlier rows were inserted
    pub instructions: Vec<InsertionInstruction>,
    pub warnings: Vec<String>,
    pub report: ReconciliationReport,
}

impl SyncPlan {
    /// Build the full plan from two ledger snapshots.
    ///
    /// Fails only on internal inconsistencies (a missing transaction that
    /// cannot be located in `bank`), before anything is written.
    pub fn build(
        bank: &[Transaction],
        target: &[Transaction],
        rules: &RuleEngine,
        engine: &ReconciliationEngine,
        today: NaiveDate,
    ) -> SyncResult<Self> {
        let report = engine.find_missing(bank, target, today);
        info!("{}", report.summary());

        let rows = PlacementPlanner::new(bank, target).plan(&report.missing)?;

        let instructions = report
            .missing
            .iter()
            .zip(rows)
            .map(|(tx, row)| InsertionInstruction::new(row, tx, rules))
            .collect();

        Ok(SyncPlan {
            instructions,
            warnings: report.warnings(),
            report,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Oldest date among the rows to insert
    pub fn oldest_date(&self) -> Option<NaiveDate> {
        self.instructions.iter().map(|i| i.date).min()
    }

    /// Prepend diagnostics gathered before reconciliation (parsing, rule loading)
    pub fn with_warnings(mut self, earlier: Vec<String>) -> Self {
        let mut warnings = earlier;
        warnings.append(&mut self.warnings);
        self.warnings = warnings;
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ClassificationRule, MatchKind, QuarterMode};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(d: NaiveDate, cents: i64, description: &str) -> Transaction {
        Transaction::new(d, Decimal::new(cents, 2), description)
    }

    fn rules() -> RuleEngine {
        RuleEngine::from_rules(vec![
            ClassificationRule::new(MatchKind::PrefixMatch, "Coffee", "Food", "", QuarterMode::None).unwrap(),
            ClassificationRule::new(MatchKind::Exact, "Coffee Shop", "Food", "Coffee", QuarterMode::None).unwrap(),
            ClassificationRule::new(MatchKind::PrefixMatch, "IRS", "Taxes", "", QuarterMode::Auto).unwrap(),
        ])
    }

    #[test]
    fn test_single_missing_into_empty_ledger() {
        let bank = vec![tx(date(2024, 1, 10), 1250, "Coffee Shop")];

        let plan = SyncPlan::build(
            &bank,
            &[],
            &rules(),
            &ReconciliationEngine::with_window(28),
            date(2024, 1, 15),
        )
        .unwrap();

        assert_eq!(plan.len(), 1);
        assert!(plan.warnings.is_empty());

        let row = &plan.instructions[0];
        assert_eq!(row.row_index, 0);
        assert_eq!(row.date, date(2024, 1, 10));
        assert_eq!(row.amount, Decimal::new(1250, 2));
        assert_eq!(row.category.as_deref(), Some("Food"));
        assert_eq!(row.subcategory.as_deref(), Some("Coffee"));
        assert_eq!(row.quarter, "");
    }

    #[test]
    fn test_amount_mismatch_produces_no_instruction() {
        let bank = vec![tx(date(2024, 1, 10), 1250, "Coffee Shop")];
        let target = vec![tx(date(2024, 1, 10), 999, "Coffee Shop")];

        let plan = SyncPlan::build(&bank, &target, &rules(), &ReconciliationEngine::new(), date(2024, 1, 15)).unwrap();

        assert!(plan.is_empty());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("differing money"));
    }

    #[test]
    fn test_quarter_and_empty_subcategory() {
        let bank = vec![tx(date(2024, 4, 15), -30000, "IRS Payment")];

        let plan = SyncPlan::build(&bank, &[], &rules(), &ReconciliationEngine::new(), date(2024, 4, 20)).unwrap();

        let row = &plan.instructions[0];
        assert_eq!(row.quarter, "2024 Q2");
        assert_eq!(row.category.as_deref(), Some("Taxes"));
        assert_eq!(row.subcategory, None);
    }

    #[test]
    fn test_unclassified_row() {
        let bank = vec![tx(date(2024, 1, 10), 100, "Mystery Shop")];

        let plan = SyncPlan::build(&bank, &[], &rules(), &ReconciliationEngine::new(), date(2024, 1, 15)).unwrap();

        let row = &plan.instructions[0];
        assert!(!row.is_classified());
        assert_eq!(row.quarter, "");

        let json = serde_json::to_value(row).unwrap();
        assert!(json.get("category").is_none());
        assert!(json.get("subcategory").is_none());
    }

    #[test]
    fn test_batch_rows_and_oldest_date() {
        let bank = vec![
            tx(date(2024, 1, 14), 100, "Newest"),
            tx(date(2024, 1, 13), 100, "Recorded"),
            tx(date(2024, 1, 12), 100, "Middle"),
            tx(date(2024, 1, 11), 100, "Oldest"),
        ];
        let target = vec![tx(date(2024, 1, 13), 100, "Recorded")];

        let plan = SyncPlan::build(&bank, &target, &rules(), &ReconciliationEngine::new(), date(2024, 1, 15)).unwrap();

        let rows: Vec<(usize, &str)> = plan
            .instructions
            .iter()
            .map(|i| (i.row_index, i.description.as_str()))
            .collect();
        // Newest above "Recorded", the two older ones appended below it in order
        assert_eq!(rows, vec![(0, "Newest"), (2, "Middle"), (3, "Oldest")]);
        assert_eq!(plan.oldest_date(), Some(date(2024, 1, 11)));
    }

    #[test]
    fn test_with_warnings_prepends() {
        let bank = vec![tx(date(2024, 1, 10), 1250, "Coffee Shop")];
        let target = vec![tx(date(2024, 1, 10), 999, "Coffee Shop")];

        let plan = SyncPlan::build(&bank, &target, &rules(), &ReconciliationEngine::new(), date(2024, 1, 15))
            .unwrap()
            .with_warnings(vec!["parser warning".to_string()]);

        assert_eq!(plan.warnings.len(), 2);
        assert_eq!(plan.warnings[0], "parser warning");
    }
}
