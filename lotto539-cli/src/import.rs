use anyhow::{Context, Result};
use lotto539_db::rusqlite::Connection;
use std::path::Path;

use lotto539_db::db::insert_raw_row;
use lotto539_db::models::{DateCell, NumberCell, RawRow, PICK_COUNT};
use lotto539_db::store::normalize_date;

use chrono::Datelike;

const FALLBACK_PARTITION: &str = "misc";

/// Cell as a spreadsheet would have typed it: integers and reals stay
/// numeric, anything else is text.
pub fn parse_number_cell(raw: &str) -> NumberCell {
    let s = raw.trim();
    if s.is_empty() {
        NumberCell::Empty
    } else if let Ok(v) = s.parse::<i64>() {
        NumberCell::Integer(v)
    } else if let Ok(v) = s.parse::<f64>() {
        NumberCell::Real(v)
    } else {
        NumberCell::Text(s.to_string())
    }
}

fn parse_date_cell(raw: &str) -> DateCell {
    let s = raw.trim();
    if s.is_empty() {
        DateCell::Empty
    } else {
        DateCell::Text(s.to_string())
    }
}

/// Year of the row's date, or the fallback label when it has none.
fn partition_for(date: &DateCell) -> String {
    normalize_date(date)
        .map(|d| d.year().to_string())
        .unwrap_or_else(|| FALLBACK_PARTITION.to_string())
}

/// `date,n1,n2,n3,n4,n5`. Cells are kept raw; validation happens when the
/// draw store is rebuilt.
pub fn parse_record(record: &csv::StringRecord, partition: Option<&str>) -> RawRow {
    let date = parse_date_cell(record.get(0).unwrap_or(""));
    let numbers = (1..=PICK_COUNT)
        .map(|idx| parse_number_cell(record.get(idx).unwrap_or("")))
        .collect();
    let partition = match partition {
        Some(p) => p.to_string(),
        None => partition_for(&date),
    };
    RawRow {
        partition,
        date,
        numbers,
    }
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path, partition: Option<&str>) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Unable to open {:?}", path))?;

    let tx = conn
        .unchecked_transaction()
        .context("Unable to start transaction")?;

    let mut result = ImportResult::default();

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => {
                let row = parse_record(&record, partition);
                match insert_raw_row(&tx, &row) {
                    Ok(true) => result.inserted += 1,
                    Ok(false) => result.skipped += 1,
                    Err(e) => {
                        log::warn!("Insert failed for line {}: {}", result.total_records, e);
                        result.errors += 1;
                    }
                }
            }
            Err(e) => {
                log::warn!("Unreadable line {}: {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    log::info!(
        "Imported {:?}: {} inserted, {} duplicates, {} errors",
        path, result.inserted, result.skipped, result.errors
    );
    Ok(result)
}
