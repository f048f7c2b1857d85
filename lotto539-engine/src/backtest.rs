use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use lotto539_db::models::PICK_COUNT;
use lotto539_db::store::DrawStore;

use crate::history::RecommendationRecord;

const BASIS_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const BASIS_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

// `YYYY-M-D` or `YYYY/M/D` at the start of the field, anything after it.
static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{4})[/-](\d{1,2})[/-](\d{1,2})").expect("valid date prefix pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitOutcome {
    Verified {
        verification_date: NaiveDate,
        hit_numbers: BTreeSet<u8>,
        hit_count: usize,
    },
    /// No draw after the basis date yet.
    Pending,
    MalformedBasisDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitCheck {
    pub timestamp: String,
    pub basis: String,
    pub basis_date: Option<NaiveDate>,
    pub outcome: HitOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitSummary {
    pub verified: usize,
    pub pending: usize,
    pub malformed: usize,
    /// `by_hit_count[k]` = verified records with exactly k hits.
    pub by_hit_count: [usize; PICK_COUNT + 1],
}

impl HitSummary {
    pub fn total_hits(&self) -> usize {
        self.by_hit_count.iter().enumerate().map(|(k, n)| k * n).sum()
    }

    pub fn average_hits(&self) -> f64 {
        if self.verified == 0 {
            return 0.0;
        }
        self.total_hits() as f64 / self.verified as f64
    }
}

/// Matches each record with the first draw strictly after its basis date.
/// Results follow log order.
pub fn check_hits(records: &[RecommendationRecord], store: &DrawStore) -> Vec<HitCheck> {
    records
        .iter()
        .map(|record| {
            let basis_date = parse_basis_date(&record.basis);
            let outcome = match basis_date {
                None => HitOutcome::MalformedBasisDate,
                Some(date) => match store.first_after(date) {
                    None => HitOutcome::Pending,
                    Some(draw) => {
                        let hit_numbers: BTreeSet<u8> = record
                            .top5
                            .iter()
                            .copied()
                            .filter(|&n| draw.numbers.contains(n))
                            .collect();
                        HitOutcome::Verified {
                            verification_date: draw.date,
                            hit_count: hit_numbers.len(),
                            hit_numbers,
                        }
                    }
                },
            };
            HitCheck {
                timestamp: record.timestamp.clone(),
                basis: record.basis.clone(),
                basis_date,
                outcome,
            }
        })
        .collect()
}

pub fn summarize(checks: &[HitCheck]) -> HitSummary {
    let mut summary = HitSummary::default();
    for check in checks {
        match &check.outcome {
            HitOutcome::Verified { hit_count, .. } => {
                summary.verified += 1;
                summary.by_hit_count[(*hit_count).min(PICK_COUNT)] += 1;
            }
            HitOutcome::Pending => summary.pending += 1,
            HitOutcome::MalformedBasisDate => summary.malformed += 1,
        }
    }
    summary
}

/// Basis date of a log line. Besides the usual formats, anything that
/// starts with `YYYY-M-D` or `YYYY/M/D` is accepted.
pub fn parse_basis_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    BASIS_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            BASIS_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| parse_date_prefix(s))
}

fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
    let caps = DATE_PREFIX.captures(s)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
