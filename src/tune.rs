//! Two-stage hyperparameter search
//!
//! Stage 1 scans tree counts with the feature-split count fixed; stage 2 scans
//! feature-split counts with the winning tree count. Each candidate is scored
//! by [`estimate_quality`] and the winner of a stage is picked by
//! [`select_best`]. The final forest is refit on the whole table.

use crate::forest::{RegressorConfig, DEFAULT_MAX_FEATURES};
use crate::metrics::round_to;
use crate::model::{FittedModel, ModelMetadata};
use crate::property;
use crate::quality::{estimate_quality, QualityEstimate, QualityOptions};
use crate::table::TrainingTable;
use crate::tracking::{RunStatus, TrialLog, TrialRecord, TuningRun, TuningStage};
use crate::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

/// Candidate grids of the two stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningGrid {
    tree_counts: Vec<usize>,
    feature_splits: Vec<usize>,
    stage_one_max_features: usize,
}

impl Default for TuningGrid {
    /// Tree counts 20, 40, …, 500 and feature-split counts 1 through 12.
    fn default() -> Self {
        Self {
            tree_counts: (20..=500).step_by(20).collect(),
            feature_splits: (1..=12).collect(),
            stage_one_max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

impl TuningGrid {
    /// Custom grids; stage 1 keeps the default feature-split count.
    #[must_use]
    pub fn new(tree_counts: Vec<usize>, feature_splits: Vec<usize>) -> Self {
        Self {
            tree_counts,
            feature_splits,
            stage_one_max_features: DEFAULT_MAX_FEATURES,
        }
    }

    /// Stage-1 candidates.
    #[must_use]
    pub fn tree_counts(&self) -> &[usize] {
        &self.tree_counts
    }

    /// Stage-2 candidates.
    #[must_use]
    pub fn feature_splits(&self) -> &[usize] {
        &self.feature_splits
    }

    /// Feature-split count used throughout stage 1.
    #[must_use]
    pub const fn stage_one_max_features(&self) -> usize {
        self.stage_one_max_features
    }
}

/// A scored candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Tree count (stage 1) or feature-split count (stage 2)
    pub parameter: usize,
    /// Median hold-out scores
    pub estimate: QualityEstimate,
}

/// Pick the winner of a stage.
///
/// Candidates are stable-sorted ascending by `(-mae, r2)` and the last one is
/// returned: the lowest MAE, on equal MAE the highest R², and on a full tie
/// the candidate evaluated later.
#[must_use]
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        (-a.estimate.mae)
            .total_cmp(&-b.estimate.mae)
            .then(a.estimate.r2.total_cmp(&b.estimate.r2))
    });
    ranked.last().copied()
}

/// Property tag encoded in a table file name.
///
/// The name must start with `df`, its third character must be a known tag
/// and its fourth an underscore, e.g. `dfz_20240101_120000_000.parquet`.
#[must_use]
pub fn infer_tag(path: &Path) -> Option<char> {
    let name = path.file_name()?.to_str()?;
    let mut chars = name.strip_prefix("df")?.chars();
    let tag = chars.next()?;
    (chars.next() == Some('_') && property::find(tag).is_some()).then_some(tag)
}

/// Everything a tuning run produced.
#[derive(Debug, Clone)]
pub struct TuningOutcome {
    /// Final model fit on the whole table
    pub model: FittedModel,
    /// Every candidate evaluation, both stages
    pub trials: TrialLog,
    /// Run lifecycle record
    pub run: TuningRun,
}

struct StageResult {
    best: Candidate,
    last: Candidate,
}

/// Grid-search driver.
#[derive(Debug, Clone, Default)]
pub struct Tuner {
    grid: TuningGrid,
    options: QualityOptions,
}

impl Tuner {
    /// Create a tuner.
    #[must_use]
    pub const fn new(grid: TuningGrid, options: QualityOptions) -> Self {
        Self { grid, options }
    }

    /// Candidate grids.
    #[must_use]
    pub const fn grid(&self) -> &TuningGrid {
        &self.grid
    }

    /// Quality estimation options used for every candidate.
    #[must_use]
    pub const fn options(&self) -> &QualityOptions {
        &self.options
    }

    fn config(&self, n_estimators: usize, max_features: usize) -> RegressorConfig {
        let config = RegressorConfig::new(n_estimators, max_features);
        match self.options.seed() {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }

    fn run_stage(
        &self,
        stage: TuningStage,
        candidates: &[usize],
        config_for: impl Fn(usize) -> RegressorConfig,
        table: (&[Vec<f64>], &[f64]),
        run_id: &str,
        trials: &mut TrialLog,
    ) -> Result<StageResult> {
        let (features, targets) = table;
        let mut scored = Vec::with_capacity(candidates.len());
        for &parameter in candidates {
            let estimate = estimate_quality(&config_for(parameter), features, targets, &self.options)?;
            info!(%stage, parameter, mae = estimate.mae, r2 = estimate.r2, "candidate evaluated");
            trials.add_trial(TrialRecord::new(run_id, stage, parameter, estimate.mae, estimate.r2));
            scored.push(Candidate { parameter, estimate });
        }

        let (Some(best), Some(last)) = (select_best(&scored).copied(), scored.last().copied()) else {
            return Err(Error::InvalidInput(format!("No {stage} candidates to evaluate")));
        };
        info!(
            %stage,
            parameter = best.parameter,
            mae = best.estimate.mae,
            r2 = best.estimate.r2,
            "Best result"
        );
        Ok(StageResult { best, last })
    }

    /// Stage 1: score every tree count with the stage-1 feature-split count.
    ///
    /// # Errors
    ///
    /// Returns error if the grid is empty or an estimate fails.
    pub fn search_tree_counts(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        run_id: &str,
        trials: &mut TrialLog,
    ) -> Result<Candidate> {
        let max_features = self.grid.stage_one_max_features;
        self.run_stage(
            TuningStage::TreeCount,
            &self.grid.tree_counts,
            |n_estimators| self.config(n_estimators, max_features),
            (features, targets),
            run_id,
            trials,
        )
        .map(|stage| stage.best)
    }

    /// Stage 2: score every feature-split count with a fixed tree count.
    ///
    /// Returns the winner and the last evaluated candidate.
    ///
    /// # Errors
    ///
    /// Returns error if the grid is empty or an estimate fails.
    pub fn search_feature_splits(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        n_estimators: usize,
        run_id: &str,
        trials: &mut TrialLog,
    ) -> Result<(Candidate, Candidate)> {
        self.run_stage(
            TuningStage::FeatureSplit,
            &self.grid.feature_splits,
            |max_features| self.config(n_estimators, max_features),
            (features, targets),
            run_id,
            trials,
        )
        .map(|stage| (stage.best, stage.last))
    }

    /// Run both stages and fit the final model on the whole table.
    ///
    /// The model metadata carries the scores of the last stage-2 evaluation,
    /// with R² rounded to two decimals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTable`] for an empty table, otherwise any error
    /// raised while estimating or fitting.
    pub fn tune(&self, table: &TrainingTable, tag: Option<char>) -> Result<TuningOutcome> {
        let run_id = format!(
            "{}-{}",
            tag.map_or_else(|| "dry".to_string(), String::from),
            Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        let mut run = TuningRun::new(run_id.clone(), tag);
        let mut trials = TrialLog::new();
        run.start();

        match self.search(table, tag, &run_id, &mut trials) {
            Ok(model) => {
                run.complete(RunStatus::Success);
                Ok(TuningOutcome { model, trials, run })
            }
            Err(e) => {
                run.complete(RunStatus::Failed);
                error!(run_id = run.run_id(), error = %e, "tuning run failed");
                Err(e)
            }
        }
    }

    fn search(
        &self,
        table: &TrainingTable,
        tag: Option<char>,
        run_id: &str,
        trials: &mut TrialLog,
    ) -> Result<FittedModel> {
        if table.is_empty() {
            return Err(Error::EmptyTable);
        }
        let features = table.features();
        let targets = table.targets();

        let trees = self.search_tree_counts(&features, &targets, run_id, trials)?;
        let (splits, last) =
            self.search_feature_splits(&features, &targets, trees.parameter, run_id, trials)?;
        info!(
            n_estimators = trees.parameter,
            max_features = splits.parameter,
            "selected hyperparameters"
        );

        let config = self.config(trees.parameter, splits.parameter);
        let forest = config.fit(&features, &targets)?;
        let metadata = ModelMetadata {
            mae: last.estimate.mae,
            r2: round_to(last.estimate.r2, 2),
            n_estimators: config.n_estimators(),
            max_features: config.max_features(),
            tag,
            created_at: Utc::now(),
        };
        Ok(FittedModel::new(forest, metadata))
    }
}
