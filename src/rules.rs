// 🏷️ Classification Rules - Rules as Data
// Exact and prefix matching of transaction descriptions to categories

use crate::error::SyncError;
use anyhow::{Context as AnyhowContext, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    /// Whole description must equal the pattern
    Exact,
    /// Description must start with the pattern
    PrefixMatch,
}

impl MatchKind {
    /// Parse the rule file spelling ("full" / "prefix")
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "full" | "exact" => Some(MatchKind::Exact),
            "prefix" => Some(MatchKind::PrefixMatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuarterMode {
    #[default]
    None,
    /// Derive "<year> Q<n>" from the transaction date
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    kind: MatchKind,
    pattern: String,
    category: String,
    subcategory: String,
    quarter: QuarterMode,
}

impl ClassificationRule {
    /// Build a rule; pattern and category must be non-empty
    pub fn new(
        kind: MatchKind,
        pattern: &str,
        category: &str,
        subcategory: &str,
        quarter: QuarterMode,
    ) -> Result<Self, SyncError> {
        if pattern.trim().is_empty() {
            return Err(SyncError::InvalidRule("missing match pattern".to_string()));
        }
        if category.trim().is_empty() {
            return Err(SyncError::InvalidRule("missing category".to_string()));
        }

        Ok(ClassificationRule {
            kind,
            pattern: pattern.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            quarter,
        })
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Empty when the rule carries no subcategory
    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    pub fn quarter(&self) -> QuarterMode {
        self.quarter
    }

    /// Quarter label for a transaction on `date`, empty unless the mode is Auto
    pub fn quarter_label(&self, date: NaiveDate) -> String {
        match self.quarter {
            QuarterMode::Auto => quarter_label(date),
            QuarterMode::None => String::new(),
        }
    }

    /// Check the rule against an already-normalized description
    fn matches_normalized(&self, normalized: &str) -> bool {
        let pattern = normalize(&self.pattern);
        match self.kind {
            MatchKind::Exact => normalized == pattern,
            MatchKind::PrefixMatch => normalized.starts_with(&pattern),
        }
    }
}

/// "<year> Q<n>" with n = ceil(month / 3)
pub fn quarter_label(date: NaiveDate) -> String {
    format!("{} Q{}", date.year(), (date.month() + 2) / 3)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

// ============================================================================
// MATCHING
// ============================================================================

/// Find the best rule for a description.
///
/// Exact rules are tried first, in order; prefix rules only if no exact rule
/// matched. First match wins within each pass.
pub fn find<'a>(rules: &'a [ClassificationRule], description: &str) -> Option<&'a ClassificationRule> {
    let normalized = normalize(description);

    let pass = |kind: MatchKind| {
        rules
            .iter()
            .filter(move |rule| rule.kind == kind)
            .find(|rule| rule.matches_normalized(&normalized))
    };

    pass(MatchKind::Exact).or_else(|| pass(MatchKind::PrefixMatch))
}

// ============================================================================
// RULE FILE ENTRY
// ============================================================================

/// Shape of one entry in classifications.json, before validation
#[derive(Debug, Deserialize)]
struct RuleEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(rename = "match")]
    pattern: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    quarter: Option<String>,
}

impl RuleEntry {
    fn into_rule(self) -> Result<ClassificationRule, SyncError> {
        let kind = self
            .kind
            .as_deref()
            .and_then(MatchKind::from_code)
            .ok_or_else(|| SyncError::InvalidRule("unrecognized type".to_string()))?;

        let quarter = match self.quarter.as_deref() {
            None | Some("") => QuarterMode::None,
            Some("auto") => QuarterMode::Auto,
            Some(other) => {
                return Err(SyncError::InvalidRule(format!("unrecognized quarter '{}'", other)))
            }
        };

        ClassificationRule::new(
            kind,
            self.pattern.as_deref().unwrap_or(""),
            self.category.as_deref().unwrap_or(""),
            self.subcategory.as_deref().unwrap_or(""),
            quarter,
        )
    }
}

// ============================================================================
// RULE ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<ClassificationRule>,
    rejected: Vec<String>,
}

impl RuleEngine {
    /// Create engine from a list of already-validated rules
    pub fn from_rules(rules: Vec<ClassificationRule>) -> Self {
        RuleEngine {
            rules,
            rejected: Vec::new(),
        }
    }

    /// Load rules from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        RuleEngine::from_json_str(&content)
            .with_context(|| format!("Failed to load rules from {:?}", path.as_ref()))
    }

    /// Load rules from a JSON array.
    ///
    /// Entries that fail validation are skipped and recorded in
    /// [`RuleEngine::rejected`]; the remaining rules keep their file order.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: Vec<Value> =
            serde_json::from_str(content).context("Rules JSON must be an array of objects")?;

        let mut engine = RuleEngine::default();

        for (index, value) in entries.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RuleEntry>(value.clone())
                .map_err(|e| SyncError::InvalidRule(e.to_string()))
                .and_then(RuleEntry::into_rule);

            match parsed {
                Ok(rule) => engine.rules.push(rule),
                Err(e) => {
                    let diagnostic = format!("Rule #{} rejected ({}): {}", index, e, value);
                    warn!("{}", diagnostic);
                    engine.rejected.push(diagnostic);
                }
            }
        }

        Ok(engine)
    }

    pub fn find(&self, description: &str) -> Option<&ClassificationRule> {
        find(&self.rules, description)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Diagnostics for entries excluded while loading
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
