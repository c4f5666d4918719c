//! Quality estimation by repeated random hold-out
//!
//! Each attempt shuffles the samples, holds out `ceil(n * test_fraction)` of
//! them, fits a fresh forest on the rest and scores it on the held-out part.
//! The reported numbers are the medians over all attempts.

use crate::forest::{check_shape, RegressorConfig};
use crate::metrics::{mean_absolute_error, median, r2_score};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hold-out attempts when none is given
pub const DEFAULT_ATTEMPTS: usize = 30;
/// Held-out fraction when none is given
pub const DEFAULT_TEST_FRACTION: f64 = 0.33;

/// Options for [`estimate_quality`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityOptions {
    attempts: usize,
    test_fraction: f64,
    seed: Option<u64>,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: None,
        }
    }
}

impl QualityOptions {
    /// Set the number of attempts.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    /// Set the held-out fraction.
    #[must_use]
    pub const fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Seed the splits and the per-attempt forests.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of attempts.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Held-out fraction.
    #[must_use]
    pub const fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Seed, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(Error::InvalidInput("attempts must be at least 1".to_string()));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(Error::InvalidInput(format!(
                "test_fraction must lie in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// Median hold-out error of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityEstimate {
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
}

/// Shuffle `0..n` and split it into `(train, test)` index sets.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if either side would be empty.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn holdout_split<R: Rng + ?Sized>(
    n: usize,
    test_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::InvalidInput(format!(
            "Cannot hold out {n_test} of {n} samples: train and test must both be non-empty"
        )));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

fn gather(features: &[Vec<f64>], targets: &[f64], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    indices
        .iter()
        .map(|&i| (features[i].clone(), targets[i]))
        .unzip()
}

/// Run every hold-out attempt and return the per-attempt scores.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for invalid options or a bad feature matrix.
pub fn evaluate_attempts(
    config: &RegressorConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    options: &QualityOptions,
) -> Result<Vec<QualityEstimate>> {
    options.validate()?;
    check_shape(features, targets)?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut scores = Vec::with_capacity(options.attempts);
    for attempt in 0..options.attempts {
        let (train, test) = holdout_split(targets.len(), options.test_fraction, &mut rng)?;
        let (x_train, y_train) = gather(features, targets, &train);
        let (x_test, y_test) = gather(features, targets, &test);

        let attempt_config = match options.seed {
            Some(_) => config.with_seed(rng.gen()),
            None => *config,
        };
        let forest = attempt_config.fit(&x_train, &y_train)?;
        let predictions = forest.predict(&x_test)?;

        let score = QualityEstimate {
            mae: mean_absolute_error(&y_test, &predictions),
            r2: r2_score(&y_test, &predictions),
        };
        debug!(attempt, mae = score.mae, r2 = score.r2, "hold-out attempt");
        scores.push(score);
    }
    Ok(scores)
}

/// Median MAE and R² of `config` over repeated random hold-out splits.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for zero attempts, a fraction outside
/// `(0, 1)`, mismatched lengths, or an empty or ragged feature matrix.
pub fn estimate_quality(
    config: &RegressorConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    options: &QualityOptions,
) -> Result<QualityEstimate> {
    let scores = evaluate_attempts(config, features, targets, options)?;
    let maes: Vec<f64> = scores.iter().map(|s| s.mae).collect();
    let r2s: Vec<f64> = scores.iter().map(|s| s.r2).collect();
    match (median(&maes), median(&r2s)) {
        (Some(mae), Some(r2)) => Ok(QualityEstimate { mae, r2 }),
        _ => Err(Error::InvalidInput("No hold-out attempt was run".to_string())),
    }
}
