//! Trial record - the score of one evaluated candidate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Search stage a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TuningStage {
    /// Stage 1: number of trees, feature-split count fixed
    TreeCount,
    /// Stage 2: features per split, tree count fixed
    FeatureSplit,
}

impl fmt::Display for TuningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TreeCount => write!(f, "tree-count"),
            Self::FeatureSplit => write!(f, "feature-split"),
        }
    }
}

/// Median hold-out scores of one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    run_id: String,
    stage: TuningStage,
    parameter: usize,
    mae: f64,
    r2: f64,
    timestamp: DateTime<Utc>,
}

impl TrialRecord {
    /// Create a trial stamped with the current time.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        stage: TuningStage,
        parameter: usize,
        mae: f64,
        r2: f64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            stage,
            parameter,
            mae,
            r2,
            timestamp: Utc::now(),
        }
    }

    /// Parent run.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Search stage.
    #[must_use]
    pub const fn stage(&self) -> TuningStage {
        self.stage
    }

    /// Candidate value: tree count in stage 1, feature count in stage 2.
    #[must_use]
    pub const fn parameter(&self) -> usize {
        self.parameter
    }

    /// Median MAE.
    #[must_use]
    pub const fn mae(&self) -> f64 {
        self.mae
    }

    /// Median R².
    #[must_use]
    pub const fn r2(&self) -> f64 {
        self.r2
    }

    /// When the trial finished.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_new() {
        let trial = TrialRecord::new("run-1", TuningStage::FeatureSplit, 4, 1.5, 0.7);
        assert_eq!(trial.run_id(), "run-1");
        assert_eq!(trial.stage(), TuningStage::FeatureSplit);
        assert_eq!(trial.parameter(), 4);
        assert!((trial.mae() - 1.5).abs() < f64::EPSILON);
        assert!((trial.r2() - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(TuningStage::TreeCount.to_string(), "tree-count");
        assert_eq!(TuningStage::FeatureSplit.to_string(), "feature-split");
    }
}
