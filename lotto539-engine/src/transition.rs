use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lotto539_db::models::{Draw, POOL_SIZE};

use crate::error::ModelError;

pub const MAX_FOLLOWERS: usize = 10;
pub const MODEL_VERSION: u32 = 1;

const KEY_MARKER: &str = "🔁";
const KEY_LABEL: &str = "號碼";
const COUNT_PREFIX: &str = "出現";
const COUNT_SUFFIX: &str = "次";
const FIELD_SEPARATOR: char = '：';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    pub number: u8,
    pub count: u32,
}

/// For each number, the numbers seen in the draw right after a draw
/// containing it, most frequent first (ties by ascending number).
/// Numbers without any transition have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionModel {
    entries: BTreeMap<u8, Vec<Follower>>,
}

/// On-disk shape of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub version: u32,
    pub entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub number: u8,
    pub followers: Vec<Follower>,
}

impl TransitionModel {
    /// Counts transitions over every pair of index-adjacent draws. Draws
    /// must be in ascending date order; calendar gaps between them are not
    /// taken into account.
    pub fn build(draws: &[Draw], max_followers: usize) -> Self {
        let size = POOL_SIZE as usize + 1;
        let mut counts = vec![vec![0u32; size]; size];

        for pair in draws.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            for from in current.numbers.iter() {
                for to in next.numbers.iter() {
                    counts[from as usize][to as usize] += 1;
                }
            }
        }

        let mut entries = BTreeMap::new();
        for from in 1..=POOL_SIZE {
            let mut followers: Vec<Follower> = (1..=POOL_SIZE)
                .filter_map(|to| {
                    let count = counts[from as usize][to as usize];
                    (count > 0).then_some(Follower { number: to, count })
                })
                .collect();
            if followers.is_empty() {
                continue;
            }
            followers.sort_by_key(|f| (Reverse(f.count), f.number));
            followers.truncate(max_followers);
            entries.insert(from, followers);
        }

        Self { entries }
    }

    pub fn followers(&self, number: u8) -> &[Follower] {
        self.entries.get(&number).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[Follower])> + '_ {
        self.entries.iter().map(|(&n, f)| (n, f.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the line-oriented report, one block per number in ascending order.
    pub fn to_report(&self) -> String {
        let mut out = String::new();
        for (number, followers) in self.iter() {
            out.push_str(&format!("{KEY_MARKER} 當期{KEY_LABEL} {number} 出現時，下一期常見號碼：\n"));
            for f in followers {
                out.push_str(&format!(
                    "    - {:02}{FIELD_SEPARATOR}{COUNT_PREFIX} {} {COUNT_SUFFIX}\n",
                    f.number, f.count
                ));
            }
            out.push('\n');
        }
        out
    }

    /// Parses a report produced by [`TransitionModel::to_report`]. Any line
    /// that is not a key marker, a well-formed follower entry or blank is
    /// treated as corruption.
    pub fn from_report(text: &str) -> Result<Self, ModelError> {
        let mut entries: BTreeMap<u8, Vec<Follower>> = BTreeMap::new();
        let mut current: Option<u8> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            let malformed = || ModelError::MalformedLine {
                line,
                content: raw.to_string(),
            };

            if trimmed.is_empty() {
                current = None;
            } else if trimmed.starts_with(KEY_MARKER) {
                let number = parse_key(trimmed).ok_or_else(malformed)?;
                if entries.insert(number, Vec::new()).is_some() {
                    return Err(ModelError::DuplicateKey { number });
                }
                current = Some(number);
            } else if let Some(rest) = trimmed.strip_prefix('-') {
                let key = current.ok_or(ModelError::OrphanEntry { line })?;
                let follower = parse_follower(rest).ok_or_else(malformed)?;
                entries.entry(key).or_default().push(follower);
            } else {
                return Err(malformed());
            }
        }

        entries.retain(|_, followers| !followers.is_empty());
        for (&number, followers) in &entries {
            check_entry(number, followers)?;
        }
        Ok(Self { entries })
    }

    pub fn to_record(&self) -> ModelRecord {
        ModelRecord {
            version: MODEL_VERSION,
            entries: self
                .entries
                .iter()
                .map(|(&number, followers)| EntryRecord {
                    number,
                    followers: followers.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a model from its record, checking every invariant the
    /// builder guarantees.
    pub fn from_record(record: ModelRecord) -> Result<Self, ModelError> {
        if record.version != MODEL_VERSION {
            return Err(ModelError::UnsupportedVersion(record.version));
        }
        let mut entries = BTreeMap::new();
        for entry in record.entries {
            let number = entry.number;
            check_entry(number, &entry.followers)?;
            if entries.insert(number, entry.followers).is_some() {
                return Err(ModelError::DuplicateKey { number });
            }
        }
        Ok(Self { entries })
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let record: ModelRecord = serde_json::from_str(json)?;
        Self::from_record(record)
    }
}

fn invalid(number: u8, reason: &str) -> ModelError {
    ModelError::InvalidEntry {
        number,
        reason: reason.to_string(),
    }
}

fn in_pool(n: u8) -> bool {
    (1..=POOL_SIZE).contains(&n)
}

/// Invariants of one entry, whichever format it was read from: numbers in
/// the pool, positive distinct followers, at most [`MAX_FOLLOWERS`], ranked
/// by descending count then ascending number.
fn check_entry(number: u8, followers: &[Follower]) -> Result<(), ModelError> {
    if !in_pool(number) {
        return Err(invalid(number, "number out of range"));
    }
    if followers.is_empty() {
        return Err(invalid(number, "no followers"));
    }
    if followers.len() > MAX_FOLLOWERS {
        return Err(invalid(number, "too many followers"));
    }
    let mut seen = HashSet::new();
    for f in followers {
        if !in_pool(f.number) {
            return Err(invalid(number, &format!("follower {} out of range", f.number)));
        }
        if f.count == 0 {
            return Err(invalid(number, &format!("follower {} has a zero count", f.number)));
        }
        if !seen.insert(f.number) {
            return Err(invalid(number, &format!("follower {} listed twice", f.number)));
        }
    }
    let ranked = followers
        .windows(2)
        .all(|w| (Reverse(w[0].count), w[0].number) < (Reverse(w[1].count), w[1].number));
    if !ranked {
        return Err(invalid(number, "followers out of order"));
    }
    Ok(())
}

fn parse_key(line: &str) -> Option<u8> {
    let body = line.strip_prefix(KEY_MARKER)?;
    let after_label = body.split_once(KEY_LABEL).map(|(_, rest)| rest).unwrap_or(body);
    let start = after_label.find(|c: char| c.is_ascii_digit())?;
    let digits: String = after_label[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

// " 06：出現 3 次"
fn parse_follower(rest: &str) -> Option<Follower> {
    let (left, right) = rest.split_once(FIELD_SEPARATOR)?;
    if right.contains(FIELD_SEPARATOR) {
        return None;
    }
    let number = left.trim().parse::<u8>().ok()?;
    let count = right
        .trim()
        .strip_prefix(COUNT_PREFIX)?
        .strip_suffix(COUNT_SUFFIX)?
        .trim()
        .parse::<u32>()
        .ok()?;
    Some(Follower { number, count })
}

/// Writes the structured model, replacing any previous file.
pub fn save_model(model: &TransitionModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory {:?}", parent))?;
    }
    let json = model.to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("Unable to write model {:?}", path))?;
    log::info!("Transition model saved to {}", path.display());
    Ok(())
}

/// Loads the structured model; `None` when it has not been built yet.
pub fn load_model(path: &Path) -> Result<Option<TransitionModel>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read model {:?}", path))?;
    let model = TransitionModel::from_json(&json)
        .with_context(|| format!("Corrupted model {:?}", path))?;
    Ok(Some(model))
}

pub fn save_report(model: &TransitionModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory {:?}", parent))?;
    }
    std::fs::write(path, model.to_report())
        .with_context(|| format!("Unable to write report {:?}", path))?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<TransitionModel> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read report {:?}", path))?;
    let model = TransitionModel::from_report(&text)
        .with_context(|| format!("Corrupted report {:?}", path))?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{draw, sample_draws};

    #[test]
    fn test_adjacent_pair_counts() {
        let draws = vec![
            draw("2024-01-01", [1, 2, 3, 4, 5]),
            draw("2024-01-03", [1, 6, 7, 8, 9]),
        ];
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);

        let followers = model.followers(1);
        let numbers: Vec<u8> = followers.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 6, 7, 8, 9]);
        assert!(followers.iter().all(|f| f.count == 1));
        for n in 2..=5 {
            assert_eq!(model.followers(n), followers);
        }
        // the last draw has no successor
        assert!(model.followers(6).is_empty());
        assert_eq!(model.len(), 5);
    }

    #[test]
    fn test_only_adjacent_draws_count() {
        let draws = vec![
            draw("2024-01-01", [1, 2, 3, 4, 5]),
            draw("2024-01-02", [11, 12, 13, 14, 15]),
            draw("2024-01-03", [21, 22, 23, 24, 25]),
        ];
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);
        assert!(model.followers(1).iter().all(|f| (11..=15).contains(&f.number)));
        assert!(model.followers(11).iter().all(|f| (21..=25).contains(&f.number)));
    }

    #[test]
    fn test_sorted_by_count_then_number_and_truncated() {
        let draws = vec![
            draw("2024-01-01", [1, 2, 3, 4, 5]),
            draw("2024-01-02", [20, 21, 22, 23, 24]),
            draw("2024-01-03", [1, 2, 3, 4, 5]),
            draw("2024-01-04", [30, 31, 32, 33, 24]),
            draw("2024-01-05", [1, 2, 3, 4, 5]),
            draw("2024-01-06", [10, 11, 12, 13, 14]),
        ];
        let model = TransitionModel::build(&draws, MAX_FOLLOWERS);
        let followers = model.followers(1);
        assert_eq!(followers.len(), MAX_FOLLOWERS);
        assert_eq!(followers[0], Follower { number: 24, count: 2 });
        let rest: Vec<u8> = followers[1..].iter().map(|f| f.number).collect();
        assert_eq!(rest, vec![10, 11, 12, 13, 14, 20, 21, 22, 23]);
    }

    #[test]
    fn test_empty_and_single_draw() {
        assert!(TransitionModel::build(&[], MAX_FOLLOWERS).is_empty());
        let one = vec![draw("2024-01-01", [1, 2, 3, 4, 5])];
        assert!(TransitionModel::build(&one, MAX_FOLLOWERS).is_empty());
        assert_eq!(TransitionModel::default().to_report(), "");
    }

    #[test]
    fn test_report_format() {
        let draws = vec![
            draw("2024-01-01", [1, 2, 3, 4, 5]),
            draw("2024-01-03", [1, 6, 7, 8, 9]),
        ];
        let report = TransitionModel::build(&draws, MAX_FOLLOWERS).to_report();
        let mut lines = report.lines();
        assert_eq!(lines.next(), Some("🔁 當期號碼 1 出現時，下一期常見號碼："));
        assert_eq!(lines.next(), Some("    - 01：出現 1 次"));
        assert_eq!(lines.next(), Some("    - 06：出現 1 次"));
        assert!(report.contains("\n\n🔁 當期號碼 2 出現時"));
        assert!(report.ends_with("次\n\n"));
    }

    #[test]
    fn test_report_roundtrip() {
        let model = TransitionModel::build(&sample_draws(), MAX_FOLLOWERS);
        assert!(!model.is_empty());
        let parsed = TransitionModel::from_report(&model.to_report()).unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_json_roundtrip() {
        let model = TransitionModel::build(&sample_draws(), MAX_FOLLOWERS);
        let parsed = TransitionModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_malformed_bullet_is_an_error() {
        let text = "🔁 當期號碼 1 出現時，下一期常見號碼：\n    - 06：出現 x 次\n\n";
        let err = TransitionModel::from_report(text).unwrap_err();
        assert!(matches!(err, ModelError::MalformedLine { line: 2, .. }));

        let text = "🔁 當期號碼 1 出現時，下一期常見號碼：\n    - 06 出現 3 次\n";
        assert!(matches!(
            TransitionModel::from_report(text),
            Err(ModelError::MalformedLine { line: 2, .. })
        ));

        let text = "🔁 當期號碼 1 出現時，下一期常見號碼：\n    - 06：出現 3 次：extra\n";
        assert!(TransitionModel::from_report(text).is_err());
    }

    #[test]
    fn test_orphan_and_duplicate_entries() {
        let orphan = "    - 06：出現 3 次\n";
        assert!(matches!(
            TransitionModel::from_report(orphan),
            Err(ModelError::OrphanEntry { line: 1 })
        ));

        let after_blank = "🔁 當期號碼 1 出現時：\n    - 06：出現 3 次\n\n    - 07：出現 1 次\n";
        assert!(matches!(
            TransitionModel::from_report(after_blank),
            Err(ModelError::OrphanEntry { line: 4 })
        ));

        let duplicate = "🔁 當期號碼 1 出現時：\n    - 06：出現 3 次\n\n🔁 當期號碼 1 出現時：\n";
        assert!(matches!(
            TransitionModel::from_report(duplicate),
            Err(ModelError::DuplicateKey { number: 1 })
        ));
    }

    #[test]
    fn test_out_of_range_follower_rejected() {
        let text = "🔁 當期號碼 1 出現時：\n    - 40：出現 3 次\n";
        assert!(matches!(
            TransitionModel::from_report(text),
            Err(ModelError::InvalidEntry { number: 1, .. })
        ));
    }

    #[test]
    fn test_report_checks_order_and_limit() {
        let unordered = "🔁 當期號碼 1 出現時：\n    - 02：出現 1 次\n    - 07：出現 3 次\n";
        assert!(matches!(
            TransitionModel::from_report(unordered),
            Err(ModelError::InvalidEntry { number: 1, .. })
        ));

        let mut too_many = String::from("🔁 當期號碼 1 出現時：\n");
        for n in 2..=12 {
            too_many.push_str(&format!("    - {:02}：出現 1 次\n", n));
        }
        assert!(matches!(
            TransitionModel::from_report(&too_many),
            Err(ModelError::InvalidEntry { number: 1, .. })
        ));
    }

    #[test]
    fn test_record_rejects_bad_version_and_order() {
        let bad_version = r#"{"version": 2, "entries": []}"#;
        assert!(matches!(
            TransitionModel::from_json(bad_version),
            Err(ModelError::UnsupportedVersion(2))
        ));

        let unordered = r#"{"version": 1, "entries": [
            {"number": 3, "followers": [{"number": 5, "count": 1}, {"number": 6, "count": 2}]}
        ]}"#;
        assert!(matches!(
            TransitionModel::from_json(unordered),
            Err(ModelError::InvalidEntry { number: 3, .. })
        ));

        assert!(matches!(TransitionModel::from_json("{"), Err(ModelError::Json(_))));
    }

    #[test]
    fn test_save_and_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("nested").join("model.json");
        let report_path = dir.path().join("report.txt");

        assert!(load_model(&model_path).unwrap().is_none());

        let model = TransitionModel::build(&sample_draws(), MAX_FOLLOWERS);
        save_model(&model, &model_path).unwrap();
        save_report(&model, &report_path).unwrap();

        assert_eq!(load_model(&model_path).unwrap(), Some(model.clone()));
        assert_eq!(load_report(&report_path).unwrap(), model);

        std::fs::write(&model_path, "not json").unwrap();
        let err = load_model(&model_path).unwrap_err();
        assert!(err.downcast_ref::<ModelError>().is_some());
    }
}
