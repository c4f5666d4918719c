//! Bootstrap random-forest regressor
//!
//! A [`RegressorConfig`] is immutable; [`RegressorConfig::fit`] returns a new
//! [`RandomForest`] every time, so repeated evaluations never share state.
//!
//! Trees are grown in parallel with `rayon` when the `parallel` feature is on.
//! Per-tree seeds are drawn from the master RNG up front, so seeded forests are
//! identical regardless of thread scheduling.

mod tree;

pub use tree::Node;

use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tree::GrowthParams;

/// Tree count used when none is given
pub const DEFAULT_N_ESTIMATORS: usize = 100;
/// Features examined per split when none is given
pub const DEFAULT_MAX_FEATURES: usize = 2;
/// Smallest node that may be split
pub const MIN_SAMPLES_SPLIT: usize = 2;
/// Smallest allowed leaf
pub const MIN_SAMPLES_LEAF: usize = 5;

/// Immutable regressor configuration.
///
/// Depth is unlimited and every tree is fit on a bootstrap sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressorConfig {
    n_estimators: usize,
    max_features: usize,
    seed: Option<u64>,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_N_ESTIMATORS, DEFAULT_MAX_FEATURES)
    }
}

impl RegressorConfig {
    /// Create a configuration; both counts are clamped to at least 1.
    #[must_use]
    pub fn new(n_estimators: usize, max_features: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            max_features: max_features.max(1),
            seed: None,
        }
    }

    /// Fix the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of trees.
    #[must_use]
    pub const fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Features examined per split.
    #[must_use]
    pub const fn max_features(&self) -> usize {
        self.max_features
    }

    /// Random seed, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Fit a new forest on `x` (one row per sample) and `y`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or ragged matrix, or when
    /// `x` and `y` disagree in length.
    pub fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<RandomForest> {
        let n_features = check_shape(x, y)?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tree_seeds: Vec<u64> = (0..self.n_estimators).map(|_| rng.gen()).collect();

        let params = GrowthParams {
            max_features: self.max_features.min(n_features),
            max_depth: None,
            min_samples_split: MIN_SAMPLES_SPLIT,
            min_samples_leaf: MIN_SAMPLES_LEAF,
        };

        #[cfg(feature = "parallel")]
        let trees = tree_seeds
            .par_iter()
            .map(|&seed| fit_tree(x, y, seed, &params))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let trees = tree_seeds
            .iter()
            .map(|&seed| fit_tree(x, y, seed, &params))
            .collect();

        Ok(RandomForest {
            config: *self,
            n_features,
            trees,
        })
    }
}

fn fit_tree(x: &[Vec<f64>], y: &[f64], seed: u64, params: &GrowthParams) -> Node {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = y.len();
    let mut indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    tree::grow(x, y, &mut indices, 0, params, &mut rng)
}

/// Validate a feature matrix against its targets; returns the feature count.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for an empty or ragged matrix, zero-width
/// rows, non-finite values, or a length mismatch with `y`.
pub fn check_shape(x: &[Vec<f64>], y: &[f64]) -> Result<usize> {
    if x.len() != y.len() {
        return Err(Error::InvalidInput(format!(
            "Number of samples in X ({}) and y ({}) must match",
            x.len(),
            y.len()
        )));
    }
    let Some(first) = x.first() else {
        return Err(Error::InvalidInput("Cannot fit with zero samples".to_string()));
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(Error::InvalidInput("Samples have no features".to_string()));
    }
    if let Some(row) = x.iter().position(|r| r.len() != n_features) {
        return Err(Error::InvalidInput(format!(
            "Ragged feature matrix: row {row} has {} features, expected {n_features}",
            x[row].len()
        )));
    }
    if let Some(row) = x.iter().position(|r| r.iter().any(|v| !v.is_finite())) {
        return Err(Error::InvalidInput(format!(
            "Non-finite feature value in row {row}"
        )));
    }
    if let Some(row) = y.iter().position(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(format!(
            "Non-finite target value in row {row}"
        )));
    }
    Ok(n_features)
}

/// A fitted forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: RegressorConfig,
    n_features: usize,
    trees: Vec<Node>,
}

impl RandomForest {
    /// Configuration the forest was fit with.
    #[must_use]
    pub const fn config(&self) -> &RegressorConfig {
        &self.config
    }

    /// Expected feature count.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[Node] {
        &self.trees
    }

    /// Predict one sample by averaging all trees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the sample width differs from the
    /// training width.
    #[allow(clippy::cast_precision_loss)]
    pub fn predict_one(&self, sample: &[f64]) -> Result<f64> {
        if sample.len() != self.n_features {
            return Err(Error::InvalidInput(format!(
                "Expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        let total: f64 = self.trees.iter().map(|t| t.predict(sample)).sum();
        Ok(total / self.trees.len() as f64)
    }

    /// Predict every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if any row has the wrong width.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        #[cfg(feature = "parallel")]
        let predictions = x.par_iter().map(|row| self.predict_one(row)).collect();
        #[cfg(not(feature = "parallel"))]
        let predictions = x.iter().map(|row| self.predict_one(row)).collect();
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::mean_absolute_error;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f64 / n as f64;
                vec![t, (t * 7.0).sin(), 1.0 - t]
            })
            .collect();
        let y = x.iter().map(|r| 10.0 * r[0] + 2.0).collect();
        (x, y)
    }

    #[test]
    fn test_defaults() {
        let config = RegressorConfig::default();
        assert_eq!(config.n_estimators(), 100);
        assert_eq!(config.max_features(), 2);
        assert_eq!(config.seed(), None);
    }

    #[test]
    fn test_counts_clamped() {
        let config = RegressorConfig::new(0, 0);
        assert_eq!(config.n_estimators(), 1);
        assert_eq!(config.max_features(), 1);
    }

    #[test]
    fn test_fit_learns_linear_target() {
        let (x, y) = linear_data(200);
        let forest = RegressorConfig::new(30, 2).with_seed(42).fit(&x, &y).unwrap();
        assert_eq!(forest.trees().len(), 30);
        assert_eq!(forest.n_features(), 3);

        let predictions = forest.predict(&x).unwrap();
        assert!(mean_absolute_error(&y, &predictions) < 0.5);
    }

    #[test]
    fn test_seeded_fit_reproducible() {
        let (x, y) = linear_data(60);
        let config = RegressorConfig::new(8, 1).with_seed(9);
        assert_eq!(config.fit(&x, &y).unwrap(), config.fit(&x, &y).unwrap());
    }

    #[test]
    fn test_fit_rejects_bad_shapes() {
        let config = RegressorConfig::default();
        assert!(matches!(config.fit(&[], &[]), Err(Error::InvalidInput(_))));
        assert!(matches!(
            config.fit(&[vec![1.0]], &[1.0, 2.0]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            config.fit(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fit_rejects_non_finite_values() {
        let mut x: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let mut y = vec![1.0; 20];
        for i in 0..20 {
            x.push(vec![f64::NAN]);
            y.push(if i % 2 == 0 { 1000.0 } else { -1000.0 });
        }
        let config = RegressorConfig::new(1, 1).with_seed(1);
        assert!(matches!(config.fit(&x, &y), Err(Error::InvalidInput(_))));

        let x = vec![vec![1.0], vec![f64::INFINITY]];
        assert!(matches!(config.fit(&x, &[1.0, 2.0]), Err(Error::InvalidInput(_))));
        let x = vec![vec![1.0], vec![2.0]];
        assert!(matches!(config.fit(&x, &[1.0, f64::NAN]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = linear_data(20);
        let forest = RegressorConfig::new(2, 1).with_seed(0).fit(&x, &y).unwrap();
        assert!(forest.predict_one(&[1.0]).is_err());
    }

    #[test]
    fn test_forest_serde_round_trip() {
        let (x, y) = linear_data(30);
        let forest = RegressorConfig::new(3, 2).with_seed(1).fit(&x, &y).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: RandomForest = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.trees().len(), 3);
        assert_eq!(restored.config(), forest.config());
        for (a, b) in restored.predict(&x).unwrap().iter().zip(forest.predict(&x).unwrap()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
