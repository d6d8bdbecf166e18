// ⚙️ Configuration - Where the ledger, rules and bank exports live
//
// Loaded from config.json. Relative paths are resolved against the
// directory holding the config file.

use crate::reconciliation::DEFAULT_WINDOW_DAYS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// CSV ledger kept in sync
    pub ledger_path: PathBuf,

    /// Directory the bank export is downloaded into ("~" allowed)
    pub download_dir: PathBuf,

    /// Last four digits of the card, part of the export filename
    pub last4: String,

    /// Classification rules (JSON array); no classification when absent
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    #[serde(default = "default_window_days")]
    pub window_days: i64,

    /// Header rows above the ledger's data region
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,

    /// Remove the bank export after a successful import
    #[serde(default = "default_delete_export")]
    pub delete_export: bool,

    #[serde(flatten, skip_serializing)]
    unknown: BTreeMap<String, Value>,
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

fn default_header_rows() -> usize {
    1
}

fn default_delete_export() -> bool {
    true
}

impl Config {
    /// Load config from a JSON file, resolving relative paths
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Config::from_json_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.ledger_path = resolve(base, &config.ledger_path);
        config.rules_path = config.rules_path.as_ref().map(|p| resolve(base, p));
        config.download_dir = resolve(base, &expand_home(&config.download_dir));

        Ok(config)
    }

    /// Parse config JSON; unexpected keys are warned about, not rejected
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content).context("Invalid config JSON")?;

        if config.window_days < 0 {
            anyhow::bail!("window_days must not be negative (got {})", config.window_days);
        }
        if config.last4.trim().is_empty() {
            anyhow::bail!("last4 must not be empty");
        }

        for warning in config.warnings() {
            warn!("{}", warning);
        }

        Ok(config)
    }

    /// Diagnostics about the config itself
    pub fn warnings(&self) -> Vec<String> {
        if self.unknown.is_empty() {
            return Vec::new();
        }

        let keys: Vec<&str> = self.unknown.keys().map(String::as_str).collect();
        vec![format!("Unexpected keys in config: {:?}", keys)]
    }

    /// Filename prefix of this card's activity exports
    pub fn export_prefix(&self) -> String {
        format!("Chase{}_Activity", self.last4)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Expand a leading "~" using $HOME
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// Locate the single bank export in `dir` whose name starts with `prefix`
/// and ends in ".csv" (any case). None or several is an error.
pub fn find_bank_export(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list download directory: {}", dir.display()))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(prefix) && name.to_uppercase().ends_with(".CSV") {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => anyhow::bail!("Could not find {}*.csv in {}", prefix, dir.display()),
        1 => Ok(candidates.remove(0)),
        _ => anyhow::bail!(
            "Found multiple bank exports in {}: {:?}",
            dir.display(),
            candidates
        ),
    }
}

// ============================================================================
// TESTS
// ============================================================================
