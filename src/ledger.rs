// 📒 Ledger Store - The persisted, newest-first ledger and its sinks
//
// The ledger is a CSV file: `header_rows` leading rows, then one row per
// transaction with columns
//   date ("January 5, 2024"), amount ("$1,234.56"), description,
//   quarter, category, subcategory
// Only the first three columns take part in reconciliation. Extra columns are
// carried through untouched when the file is rewritten.

use crate::error::SyncError;
use crate::plan::InsertionInstruction;
use crate::transaction::Transaction;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// CELL FORMATTING
// ============================================================================

/// "January 5, 2024"
pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// "$1,234.56", negative amounts as "-$12.50"
pub fn format_ledger_amount(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2).abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

impl InsertionInstruction {
    /// Cells written for this instruction; classification cells only when a rule matched
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = vec![
            format_ledger_date(self.date),
            format_ledger_amount(self.amount),
            self.description.clone(),
        ];

        if let Some(category) = &self.category {
            cells.push(self.quarter.clone());
            cells.push(category.clone());
            if let Some(subcategory) = &self.subcategory {
                cells.push(subcategory.clone());
            }
        }

        cells
    }
}

// ============================================================================
// LEDGER FILE
// ============================================================================

/// Column row written when the ledger file has no header yet
pub const LEDGER_COLUMNS: [&str; 6] = ["Date", "Amount", "Description", "Quarter", "Category", "Subcategory"];

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
    header: Vec<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl LedgerFile {
    /// Read a ledger file. A missing file is an error; an empty file is an empty
    /// ledger whose header region is filled in with [`LEDGER_COLUMNS`].
    pub fn read(path: &Path, header_rows: usize) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger: {}", path.display()))?;

        let mut ledger = LedgerFile::parse_str(&content, header_rows)
            .with_context(|| format!("Failed to parse ledger: {}", path.display()))?;
        ledger.path = path.to_path_buf();

        Ok(ledger)
    }

    /// Parse ledger content that is not backed by a file yet
    pub fn parse_str(content: &str, header_rows: usize) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut all_rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.with_context(|| format!("Failed to read ledger row {}", index + 1))?;
            all_rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let split = header_rows.min(all_rows.len());
        let mut rows = all_rows.split_off(split);
        let mut header = all_rows;

        // A short file still gets its full header region back on save
        if header.is_empty() && header_rows > 0 {
            header.push(LEDGER_COLUMNS.iter().map(|c| c.to_string()).collect());
        }
        while header.len() < header_rows {
            header.push(vec![String::new()]);
        }

        // Spreadsheet exports pad the sheet with rows of empty cells
        let before = rows.len();
        rows.retain(|row| !is_blank(row));
        if rows.len() < before {
            debug!(dropped = before - rows.len(), "Dropped blank ledger rows");
        }

        Ok(LedgerFile {
            path: PathBuf::new(),
            header,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header_rows(&self) -> usize {
        self.header.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Data rows as transactions, in file order (index = data row index)
    pub fn transactions(&self) -> Result<Vec<Transaction>, SyncError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let line = self.header.len() + index + 1;
                if row.len() < 3 {
                    return Err(SyncError::MalformedRecord {
                        line,
                        reason: format!("expected date, amount and description, found {} cells", row.len()),
                    });
                }

                Transaction::from_ledger_fields(&row[0], &row[1], &row[2]).map_err(|e| {
                    SyncError::MalformedRecord {
                        line,
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }

    /// Insert each instruction's row at its index, in order
    pub fn insert_all(&mut self, instructions: &[InsertionInstruction]) -> Result<()> {
        for instruction in instructions {
            if instruction.row_index > self.rows.len() {
                anyhow::bail!(
                    "Row index {} is past the end of the ledger ({} rows) for {}",
                    instruction.row_index,
                    self.rows.len(),
                    instruction.description
                );
            }
            debug!(row = instruction.row_index, description = %instruction.description, "Inserting row");
            self.rows.insert(instruction.row_index, instruction.to_cells());
        }

        Ok(())
    }

    /// Write the ledger next to its path, then rename it into place
    pub fn save(&self) -> Result<()> {
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        {
            let mut writer = WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

            for row in self.header.iter().chain(self.rows.iter()) {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace ledger {}", self.path.display()))?;

        Ok(())
    }
}

// ============================================================================
// SINKS
// ============================================================================

/// Receives a complete batch and applies it in order, all or nothing
pub trait LedgerSink {
    fn apply(&mut self, instructions: &[InsertionInstruction]) -> Result<()>;
}

/// Applies the batch to the CSV ledger it was planned against
pub struct CsvLedgerSink {
    ledger: LedgerFile,
}

impl CsvLedgerSink {
    pub fn new(ledger: LedgerFile) -> Self {
        CsvLedgerSink { ledger }
    }

    pub fn ledger(&self) -> &LedgerFile {
        &self.ledger
    }
}

impl LedgerSink for CsvLedgerSink {
    fn apply(&mut self, instructions: &[InsertionInstruction]) -> Result<()> {
        // Work on a copy so a bad index leaves both memory and disk untouched
        let mut updated = self.ledger.clone();
        updated.insert_all(instructions)?;
        updated.save()?;

        info!(
            "Wrote {} new rows to {}",
            instructions.len(),
            updated.path().display()
        );
        self.ledger = updated;
        Ok(())
    }
}

/// Dry run: writes the batch as pretty JSON
pub struct JsonPlanSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonPlanSink<W> {
    pub fn new(writer: W) -> Self {
        JsonPlanSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LedgerSink for JsonPlanSink<W> {
    fn apply(&mut self, instructions: &[InsertionInstruction]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, instructions)
            .context("Failed to serialize insertion plan")?;
        writeln!(self.writer)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
