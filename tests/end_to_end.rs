use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use ledger_sync::{Config, CsvLedgerSink, JsonPlanSink, LedgerFile, LedgerSink, SyncRun};
use tempfile::TempDir;

const EXPORT: &str = "\
Transaction Date,Post Date,Description,Category,Type,Amount,Memo
01/12/2024,01/13/2024,Coffee Shop,Food & Drink,Sale,-4.50,
01/14/2024,01/15/2024,IRS TREAS 310,Taxes,Sale,-300.00,
01/11/2024,01/12/2024,GROCERY &amp; MORE,Groceries,Sale,-54.10,
01/13/2024,01/13/2024,MYSTERY,,Interest,1.00,
01/10/2024,01/11/2024,BOOKSTORE, INC,Shopping,Sale,-20.00,
01/09/2024,01/10/2024,Payment Thank You,,Payment,500.00,
12/01/2023,12/02/2023,OLD THING,Shopping,Sale,-1.00,
";

const LEDGER: &str = "\
Date,Amount,Description,Quarter,Category,Subcategory
\"January 12, 2024\",-$4.75,Coffee Shop,,Food,Coffee
\"January 10, 2024\",-$20.00,\"BOOKSTORE, INC\",,Shopping,
\"January 2, 2024\",-$9.00,Older,,Misc,
";

const RULES: &str = r#"[
    {"type": "prefix", "match": "IRS", "category": "Taxes", "quarter": "auto"},
    {"type": "prefix", "match": "grocery", "category": "Food", "subcategory": "Groceries"}
]"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn setup(dir: &Path) -> Config {
    let downloads = dir.join("downloads");
    fs::create_dir(&downloads).unwrap();
    fs::write(downloads.join("Chase1234_Activity20240115.CSV"), EXPORT).unwrap();
    fs::write(dir.join("ledger.csv"), LEDGER).unwrap();
    fs::write(dir.join("rules.json"), RULES).unwrap();

    let config_path = dir.join("config.json");
    fs::write(
        &config_path,
        r#"{
            "ledger_path": "ledger.csv",
            "rules_path": "rules.json",
            "download_dir": "downloads",
            "last4": "1234"
        }"#,
    )
    .unwrap();

    Config::from_file(&config_path).unwrap()
}

fn descriptions(ledger: &LedgerFile) -> Vec<String> {
    ledger.rows().iter().map(|row| row[2].clone()).collect()
}

#[test]
fn plans_missing_rows_with_placement_and_classification() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let run = SyncRun::prepare(&config, today()).unwrap();
    let plan = &run.plan;

    let rows: Vec<(usize, &str)> = plan
        .instructions
        .iter()
        .map(|i| (i.row_index, i.description.as_str()))
        .collect();
    assert_eq!(rows, vec![(0, "IRS TREAS 310"), (2, "GROCERY & MORE")]);

    assert_eq!(plan.instructions[0].quarter, "2024 Q1");
    assert_eq!(plan.instructions[0].category.as_deref(), Some("Taxes"));
    assert_eq!(plan.instructions[0].subcategory, None);
    assert_eq!(plan.instructions[1].subcategory.as_deref(), Some("Groceries"));

    // Unknown export row type, then the Coffee Shop amount mismatch
    assert_eq!(plan.warnings.len(), 2);
    assert!(plan.warnings[0].contains("Interest"));
    assert!(plan.warnings[1].contains("Coffee Shop"));

    assert_eq!(plan.oldest_date(), NaiveDate::from_ymd_opt(2024, 1, 11));
}

#[test]
fn applying_the_plan_keeps_the_ledger_sorted_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let run = SyncRun::prepare(&config, today()).unwrap();
    CsvLedgerSink::new(run.ledger).apply(&run.plan.instructions).unwrap();

    let ledger = LedgerFile::read(&config.ledger_path, 1).unwrap();
    assert_eq!(
        descriptions(&ledger),
        vec!["IRS TREAS 310", "Coffee Shop", "GROCERY & MORE", "BOOKSTORE, INC", "Older"]
    );
    assert_eq!(
        ledger.rows()[0],
        vec!["January 14, 2024", "-$300.00", "IRS TREAS 310", "2024 Q1", "Taxes"]
    );

    // A second run against the updated ledger finds nothing new
    let again = SyncRun::prepare(&config, today()).unwrap();
    assert!(again.plan.is_empty());
    assert_eq!(again.plan.warnings.len(), 2);
}

#[test]
fn dry_run_leaves_the_ledger_untouched() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let run = SyncRun::prepare(&config, today()).unwrap();
    let mut sink = JsonPlanSink::new(Vec::new());
    sink.apply(&run.plan.instructions).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["row_index"], 0);

    assert_eq!(fs::read_to_string(&config.ledger_path).unwrap(), LEDGER);
}

#[test]
fn window_excludes_old_bank_rows() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    // 28 days before February 10 is January 13; only the IRS row is that recent
    let later = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
    let run = SyncRun::prepare(&config, later).unwrap();

    let rows: Vec<(usize, &str)> = run
        .plan
        .instructions
        .iter()
        .map(|i| (i.row_index, i.description.as_str()))
        .collect();
    assert_eq!(rows, vec![(0, "IRS TREAS 310")]);

    // The Coffee Shop mismatch is outside the window now
    assert_eq!(run.plan.warnings.len(), 1);
}

#[test]
fn empty_ledger_file_is_filled_once() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());
    fs::write(&config.ledger_path, "").unwrap();

    let run = SyncRun::prepare(&config, today()).unwrap();
    let rows: Vec<(usize, &str)> = run
        .plan
        .instructions
        .iter()
        .map(|i| (i.row_index, i.description.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![(0, "IRS TREAS 310"), (1, "Coffee Shop"), (2, "GROCERY & MORE"), (3, "BOOKSTORE, INC")]
    );
    CsvLedgerSink::new(run.ledger).apply(&run.plan.instructions).unwrap();

    let ledger = LedgerFile::read(&config.ledger_path, 1).unwrap();
    assert_eq!(ledger.len(), 4);
    assert_eq!(ledger.header_rows(), 1);

    let again = SyncRun::prepare(&config, today()).unwrap();
    assert!(again.plan.is_empty());
    assert_eq!(LedgerFile::read(&config.ledger_path, 1).unwrap().len(), 4);
}
