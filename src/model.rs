//! Fitted model with its tuning metadata

use crate::forest::RandomForest;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores and hyperparameters attached to a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Median hold-out MAE of the last stage-2 evaluation
    pub mae: f64,
    /// Median hold-out R² of the last stage-2 evaluation, two decimals
    pub r2: f64,
    /// Selected tree count
    pub n_estimators: usize,
    /// Selected features per split
    pub max_features: usize,
    /// Property tag, `None` for a dry run
    pub tag: Option<char>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Final regressor trained on the whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    forest: RandomForest,
    metadata: ModelMetadata,
}

impl FittedModel {
    /// Pair a forest with its metadata.
    #[must_use]
    pub const fn new(forest: RandomForest, metadata: ModelMetadata) -> Self {
        Self { forest, metadata }
    }

    /// Underlying forest.
    #[must_use]
    pub const fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Tuning metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Predict one descriptor.
    ///
    /// # Errors
    ///
    /// Returns error if the descriptor length differs from the training width.
    pub fn predict(&self, descriptor: &[f64]) -> Result<f64> {
        self.forest.predict_one(descriptor)
    }
}
