use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One line of the recommendation log. Fields are kept as read so a
/// damaged line can still be reported on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationRecord {
    pub timestamp: String,
    pub basis: String,
    pub top5: Vec<u8>,
}

impl RecommendationRecord {
    pub fn new(timestamp: NaiveDateTime, basis_date: NaiveDate, top5: &[u8]) -> Self {
        Self {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            basis: basis_date.format(DATE_FORMAT).to_string(),
            top5: top5.to_vec(),
        }
    }

    fn joined_top5(&self) -> String {
        self.top5
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Comma-separated numbers; tokens that are not numbers are dropped.
pub fn parse_top5(field: &str) -> Vec<u8> {
    field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|t| t.parse::<u8>().ok())
        .collect()
}

/// Append-only recommendation log: a CSV file read back by the hit check,
/// and a free-text companion kept for people.
#[derive(Debug, Clone)]
pub struct RecommendationLog {
    csv_path: PathBuf,
    text_path: PathBuf,
}

impl RecommendationLog {
    pub fn new(csv_path: impl Into<PathBuf>, text_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            text_path: text_path.into(),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn text_path(&self) -> &Path {
        &self.text_path
    }

    pub fn append(&self, record: &RecommendationRecord, summary: &str) -> Result<()> {
        let file = open_append(&self.csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let top5 = record.joined_top5();
        writer
            .write_record([record.timestamp.as_str(), record.basis.as_str(), top5.as_str()])
            .with_context(|| format!("Unable to append to {:?}", self.csv_path))?;
        writer.flush()?;

        let mut text = open_append(&self.text_path)?;
        writeln!(text, "{}", summary.replace('\n', " | "))
            .with_context(|| format!("Unable to append to {:?}", self.text_path))?;

        log::info!("Recommendation for {} appended to {}", record.basis, self.csv_path.display());
        Ok(())
    }

    /// Every record in log order; empty when the log does not exist.
    pub fn read_all(&self) -> Result<Vec<RecommendationRecord>> {
        if !self.csv_path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.csv_path)
            .with_context(|| format!("Unable to open {:?}", self.csv_path))?;

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Unreadable log line {}: {}", idx + 1, e);
                    records.push(RecommendationRecord {
                        timestamp: String::new(),
                        basis: String::new(),
                        top5: Vec::new(),
                    });
                    continue;
                }
            };
            if record.len() != 3 {
                log::warn!("Log line {} has {} fields, expected 3", idx + 1, record.len());
            }
            let field = |i: usize| record.get(i).unwrap_or("").to_string();
            records.push(RecommendationRecord {
                timestamp: field(0),
                basis: field(1),
                top5: parse_top5(&field(2)),
            });
        }
        Ok(records)
    }

    /// Human-readable lines, oldest first.
    pub fn read_text(&self) -> Result<Vec<String>> {
        if !self.text_path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.text_path)
            .with_context(|| format!("Unable to read {:?}", self.text_path))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    /// Deletes both files and returns the ones that existed.
    pub fn clear(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in [&self.text_path, &self.csv_path] {
            if path.exists() {
                std::fs::remove_file(path)
                    .with_context(|| format!("Unable to delete {:?}", path))?;
                removed.push(path.clone());
            }
        }
        Ok(removed)
    }
}

fn open_append(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Unable to open {:?}", path))
}
