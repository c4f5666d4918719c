//! Trial log - in-memory record of every evaluated candidate

use super::{TrialRecord, TuningStage};
use serde::{Deserialize, Serialize};

/// Ordered log of trials.
///
/// Trials keep insertion order; [`TrialLog::trials_for_stage`] returns one
/// stage ordered by parameter value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLog {
    trials: Vec<TrialRecord>,
}

impl TrialLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether no trial was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Append a trial.
    pub fn add_trial(&mut self, trial: TrialRecord) {
        self.trials.push(trial);
    }

    /// Trials in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TrialRecord> {
        self.trials.iter()
    }

    /// Last logged trial.
    #[must_use]
    pub fn last(&self) -> Option<&TrialRecord> {
        self.trials.last()
    }

    /// Trials of one stage, ordered by parameter value.
    #[must_use]
    pub fn trials_for_stage(&self, stage: TuningStage) -> Vec<TrialRecord> {
        let mut trials: Vec<TrialRecord> = self
            .trials
            .iter()
            .filter(|t| t.stage() == stage)
            .cloned()
            .collect();
        trials.sort_by_key(TrialRecord::parameter);
        trials
    }
}
