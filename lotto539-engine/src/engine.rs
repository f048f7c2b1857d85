use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;

use lotto539_db::store::DrawStore;

use crate::backtest::{check_hits, HitCheck};
use crate::config::AppConfig;
use crate::history::{RecommendationLog, RecommendationRecord};
use crate::recommend::{recommend, Recommendation};
use crate::transition::{
    load_model, load_report, save_model, save_report, TransitionModel, MAX_FOLLOWERS,
};

/// Entry point for presentation layers. Every operation works on a draw
/// store rebuilt by the caller and on the files named by the config.
pub struct Engine {
    config: AppConfig,
    log: RecommendationLog,
}

impl Engine {
    pub fn new(config: AppConfig) -> Self {
        let log = RecommendationLog::new(config.history_csv_path(), config.history_txt_path());
        Self { config, log }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn log(&self) -> &RecommendationLog {
        &self.log
    }

    /// Rebuilds the model from the whole history and overwrites both the
    /// structured model and its report.
    pub fn build_transition_model(&self, store: &DrawStore) -> Result<TransitionModel> {
        let max_followers = self.config.followers_per_number.min(MAX_FOLLOWERS);
        let model = TransitionModel::build(store.all(), max_followers);
        save_model(&model, &self.config.model_path())?;
        save_report(&model, &self.config.report_path())?;
        log::info!(
            "Transition model built from {} draws ({} numbers with followers)",
            store.len(),
            model.len()
        );
        Ok(model)
    }

    /// Adopts a transition report written by an earlier tool as the current
    /// model. The report is validated like a structured model, then both
    /// files are rewritten from it.
    pub fn import_report(&self, path: &Path) -> Result<TransitionModel> {
        let model = load_report(path)?;
        save_model(&model, &self.config.model_path())?;
        save_report(&model, &self.config.report_path())?;
        log::info!("Transition report {} imported ({} numbers)", path.display(), model.len());
        Ok(model)
    }

    pub fn load_model(&self) -> Result<Option<TransitionModel>> {
        load_model(&self.config.model_path())
    }

    /// `None` until a model has been built, or when there is no draw yet.
    pub fn recommend(&self, store: &DrawStore) -> Result<Option<Recommendation>> {
        let Some(model) = self.load_model()? else {
            return Ok(None);
        };
        let Some(latest) = store.latest() else {
            return Ok(None);
        };
        Ok(Some(recommend(
            &model,
            latest,
            self.config.top_n,
            self.config.pick_count,
        )))
    }

    pub fn record_recommendation(
        &self,
        recommendation: &Recommendation,
        summary: &str,
        now: NaiveDateTime,
    ) -> Result<RecommendationRecord> {
        let record = RecommendationRecord::new(now, recommendation.basis_date, &recommendation.top5);
        self.log.append(&record, summary)?;
        Ok(record)
    }

    /// Hit check of the whole log; empty when nothing was recorded.
    pub fn check_hits(&self, store: &DrawStore) -> Result<Vec<HitCheck>> {
        let records = self.log.read_all()?;
        Ok(check_hits(&records, store))
    }

    pub fn history_lines(&self) -> Result<Vec<String>> {
        self.log.read_text()
    }

    pub fn clear_history(&self) -> Result<Vec<PathBuf>> {
        let removed = self.log.clear()?;
        log::info!("Recommendation log cleared ({} files removed)", removed.len());
        Ok(removed)
    }
}
