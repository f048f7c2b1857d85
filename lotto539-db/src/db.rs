use anyhow::{Context, Result};
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::models::{DateCell, NumberCell, RawRow};

// Columns are declared without a type so every cell keeps the storage
// class it was inserted with, like a spreadsheet cell would.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS raw_rows (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    sheet      TEXT NOT NULL,
    draw_date,
    number_1,
    number_2,
    number_3,
    number_4,
    number_5,
    UNIQUE (sheet, draw_date)
);
";

const NUMBER_COLUMNS: usize = 5;

pub fn db_path(data_dir: &Path, file_name: &str) -> PathBuf {
    data_dir.join(file_name)
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Unable to open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Migration failed")?;
    Ok(())
}

fn date_value(cell: &DateCell) -> Value {
    match cell {
        DateCell::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
        DateCell::DateTime(dt) => Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        DateCell::Text(s) => Value::Text(s.clone()),
        DateCell::Empty => Value::Null,
    }
}

fn number_value(cell: Option<&NumberCell>) -> Value {
    match cell {
        Some(NumberCell::Integer(v)) => Value::Integer(*v),
        Some(NumberCell::Real(v)) => Value::Real(*v),
        Some(NumberCell::Text(s)) => Value::Text(s.clone()),
        Some(NumberCell::Empty) | None => Value::Null,
    }
}

fn date_cell(value: ValueRef<'_>) -> DateCell {
    match value {
        ValueRef::Text(bytes) => DateCell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(v) => DateCell::Text(v.to_string()),
        ValueRef::Real(v) => DateCell::Text(v.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => DateCell::Empty,
    }
}

fn number_cell(value: ValueRef<'_>) -> NumberCell {
    match value {
        ValueRef::Integer(v) => NumberCell::Integer(v),
        ValueRef::Real(v) => NumberCell::Real(v),
        ValueRef::Text(bytes) => NumberCell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Null | ValueRef::Blob(_) => NumberCell::Empty,
    }
}

/// Stores a raw row. A row whose date already exists in the same partition
/// is ignored and `false` is returned. Only the first five number cells are
/// kept.
pub fn insert_raw_row(conn: &Connection, row: &RawRow) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO raw_rows (sheet, draw_date, number_1, number_2, number_3, number_4, number_5)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.partition,
            date_value(&row.date),
            number_value(row.numbers.first()),
            number_value(row.numbers.get(1)),
            number_value(row.numbers.get(2)),
            number_value(row.numbers.get(3)),
            number_value(row.numbers.get(4)),
        ],
    ).context("Insert failed")?;
    Ok(changed > 0)
}

/// All raw rows, partitions in ascending order and rows in insertion order
/// within a partition.
pub fn fetch_raw_rows(conn: &Connection) -> Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(
        "SELECT sheet, draw_date, number_1, number_2, number_3, number_4, number_5
         FROM raw_rows ORDER BY sheet ASC, id ASC"
    )?;
    let rows = stmt.query_map([], |row| {
        let numbers = (0..NUMBER_COLUMNS)
            .map(|i| row.get_ref(2 + i).map(number_cell))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RawRow {
            partition: row.get(0)?,
            date: date_cell(row.get_ref(1)?),
            numbers,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_partitions(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT sheet FROM raw_rows ORDER BY sheet ASC"
    )?;
    let partitions = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(partitions)
}

pub fn count_rows(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM raw_rows", [], |row| row.get(0))?;
    Ok(count)
}
