use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use lotto539_db::db::db_path;

use crate::pricing::UnitPrices;
use crate::transition::MAX_FOLLOWERS;

/// Settings shared by every component. Loaded once per run and passed
/// down explicitly; command line overrides are applied on the value, never
/// written back to the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the database, the model and the recommendation log.
    pub data_dir: PathBuf,
    pub db_file: String,
    /// Structured transition model (JSON), the source of recommendations.
    pub model_file: String,
    /// Human-readable transition report derived from the model.
    pub report_file: String,
    pub history_csv: String,
    pub history_txt: String,
    /// First and last year of the upstream fetch window; `stats` defaults to it.
    pub start_year: i32,
    pub end_year: i32,
    pub months: Vec<u32>,
    /// Size of the ranked candidate list.
    pub top_n: usize,
    /// Numbers kept for the recorded pick (prefix of the ranked list).
    pub pick_count: usize,
    /// Followers kept per number when the model is built.
    pub followers_per_number: usize,
    /// Default ticket prices for the `price` command.
    pub unit_prices: UnitPrices,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            db_file: "lotto539.db".to_string(),
            model_file: "539_transition_model.json".to_string(),
            report_file: "539_transition_analysis.txt".to_string(),
            history_csv: "recommend_history.csv".to_string(),
            history_txt: "recommend_history.txt".to_string(),
            start_year: 2024,
            end_year: 2025,
            months: (1..=12).collect(),
            top_n: 10,
            pick_count: 5,
            followers_per_number: 10,
            unit_prices: UnitPrices::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config {:?}", path))?;
        let config: AppConfig = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            bail!("start_year {} is after end_year {}", self.start_year, self.end_year);
        }
        if let Some(m) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            bail!("Invalid month {}", m);
        }
        if self.top_n == 0 || self.followers_per_number == 0 {
            bail!("top_n and followers_per_number must be positive");
        }
        if self.followers_per_number > MAX_FOLLOWERS {
            bail!(
                "followers_per_number {} exceeds the model limit of {}",
                self.followers_per_number,
                MAX_FOLLOWERS
            );
        }
        if self.pick_count > self.top_n {
            bail!("pick_count {} exceeds top_n {}", self.pick_count, self.top_n);
        }
        Ok(())
    }

    pub fn year_in_range(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }

    /// Whether `date` falls inside the configured years and months.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.year_in_range(date.year()) && self.months.contains(&date.month())
    }

    pub fn db_path(&self) -> PathBuf {
        db_path(&self.data_dir, &self.db_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.data_dir.join(&self.report_file)
    }

    pub fn history_csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_csv)
    }

    pub fn history_txt_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_txt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.top_n, 10);
        assert_eq!(config.pick_count, 5);
        assert_eq!(config.months.len(), 12);
        assert!(config.validate().is_ok());
        assert_eq!(config.model_path(), PathBuf::from("data/539_transition_model.json"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"start_year": 2020, "months": [1, 2]}"#).unwrap();
        assert_eq!(config.start_year, 2020);
        assert_eq!(config.end_year, 2025);
        assert_eq!(config.months, vec![1, 2]);
        assert_eq!(config.db_file, "lotto539.db");
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AppConfig::default().with_data_dir("/tmp/x");
        let json = serde_json::to_string(&config).unwrap();
        let restored: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.months = vec![0];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.start_year = 2026;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pick_count = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_followers_per_number_is_capped() {
        let mut config = AppConfig::default();
        config.followers_per_number = MAX_FOLLOWERS;
        assert!(config.validate().is_ok());
        config.followers_per_number = MAX_FOLLOWERS + 5;
        assert!(config.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"followers_per_number": 15}"#).unwrap();
        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_year_in_range() {
        let config = AppConfig::default();
        assert!(config.year_in_range(2024));
        assert!(!config.year_in_range(2023));

        let mut config = AppConfig::default();
        config.months = vec![1, 2];
        assert!(config.covers(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()));
        assert!(!config.covers(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        assert!(!config.covers(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"end_year": 2026}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.end_year, 2026);

        assert!(AppConfig::load(&dir.path().join("missing.json")).is_err());
        assert_eq!(AppConfig::load_or_default(None).unwrap(), AppConfig::default());
    }
}
