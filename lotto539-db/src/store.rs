use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::db::fetch_raw_rows;
use crate::models::{DateCell, Draw, NumberSet, RawRow, PICK_COUNT};

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Outcome counters of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub total: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

/// Ordered, deduplicated draw history. Rebuilt from the raw rows every time
/// it is needed; holds at most one draw per date, ascending by date.
#[derive(Debug, Clone, Default)]
pub struct DrawStore {
    draws: Vec<Draw>,
}

impl DrawStore {
    /// Normalizes raw rows into draws. Malformed rows are skipped, and the
    /// first row seen for a date wins over later ones.
    pub fn ingest(rows: &[RawRow]) -> (Self, IngestReport) {
        let mut by_date: BTreeMap<NaiveDate, Draw> = BTreeMap::new();
        let mut report = IngestReport {
            total: rows.len(),
            ..IngestReport::default()
        };

        for row in rows {
            let Some(draw) = parse_draw(row) else {
                log::debug!("Skipping malformed row in {}: {:?}", row.partition, row);
                report.skipped += 1;
                continue;
            };
            match by_date.entry(draw.date) {
                Entry::Vacant(slot) => {
                    slot.insert(draw);
                    report.accepted += 1;
                }
                Entry::Occupied(_) => report.duplicates += 1,
            }
        }

        let store = Self {
            draws: by_date.into_values().collect(),
        };
        (store, report)
    }

    /// Store over already-parsed draws; same first-wins rule per date.
    pub fn from_draws(draws: impl IntoIterator<Item = Draw>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Draw> = BTreeMap::new();
        for draw in draws {
            by_date.entry(draw.date).or_insert(draw);
        }
        Self {
            draws: by_date.into_values().collect(),
        }
    }

    /// Reads every raw row from the database and ingests it.
    pub fn load(conn: &Connection) -> Result<(Self, IngestReport)> {
        let rows = fetch_raw_rows(conn)?;
        let (store, report) = Self::ingest(&rows);
        log::info!(
            "Loaded {} draws from {} rows ({} duplicates, {} skipped)",
            report.accepted, report.total, report.duplicates, report.skipped
        );
        Ok((store, report))
    }

    pub fn latest(&self) -> Option<&Draw> {
        self.draws.last()
    }

    pub fn all(&self) -> &[Draw] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// First draw dated strictly after `date`.
    pub fn first_after(&self, date: NaiveDate) -> Option<&Draw> {
        let idx = self.draws.partition_point(|d| d.date <= date);
        self.draws.get(idx)
    }
}

/// Calendar date of a date cell, whatever shape it came in.
pub fn normalize_date(cell: &DateCell) -> Option<NaiveDate> {
    match cell {
        DateCell::Date(d) => Some(*d),
        DateCell::DateTime(dt) => Some(dt.date()),
        DateCell::Text(s) => parse_date_text(s),
        DateCell::Empty => None,
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Turns a raw row into a draw, or `None` when the date does not parse or
/// the number cells do not hold exactly five valid, distinct numbers.
pub fn parse_draw(row: &RawRow) -> Option<Draw> {
    let date = normalize_date(&row.date)?;
    let values: Vec<i64> = row.numbers.iter().filter_map(|c| c.as_integer()).collect();
    if values.len() != PICK_COUNT {
        return None;
    }
    let numbers: Vec<u8> = values
        .iter()
        .map(|&v| u8::try_from(v).ok())
        .collect::<Option<_>>()?;
    let numbers = NumberSet::new(&numbers).ok()?;
    Some(Draw { date, numbers })
}
