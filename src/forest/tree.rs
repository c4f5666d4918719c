//! CART regression tree
//!
//! Splits maximise the reduction in squared error, which for a fixed node is
//! the same as maximising `sum_l² / n_l + sum_r² / n_r`. Leaves predict the mean
//! target of the samples that reached them.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A node in a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node
    Leaf {
        /// Mean target of the training samples in this leaf
        value: f64,
        /// Number of training samples in this leaf
        n_samples: usize,
    },
    /// Internal node: samples with `x[feature] <= threshold` go left
    Split {
        /// Feature index
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Subtree for `x[feature] <= threshold`
        left: Box<Node>,
        /// Subtree for `x[feature] > threshold`
        right: Box<Node>,
    },
}

impl Node {
    /// Depth of the subtree; a leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of leaves in the subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Predict a single sample.
    #[must_use]
    pub fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf { value, .. } => return *value,
                Self::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Stopping and feature-sampling parameters for tree growth.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowthParams {
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// Grow a tree over the samples listed in `indices` (duplicates allowed).
pub(crate) fn grow<R: Rng>(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &mut [usize],
    depth: usize,
    params: &GrowthParams,
    rng: &mut R,
) -> Node {
    let n = indices.len();
    let value = mean(y, indices);

    let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
    let too_small = n < params.min_samples_split || n < 2 * params.min_samples_leaf;
    let pure = indices.iter().all(|&i| y[i] == y[indices[0]]);
    if depth_reached || too_small || pure {
        return Node::Leaf { value, n_samples: n };
    }

    let Some(split) = best_split(x, y, indices, params, rng) else {
        return Node::Leaf { value, n_samples: n };
    };

    let mut boundary = 0;
    for i in 0..n {
        if x[indices[i]][split.feature] <= split.threshold {
            indices.swap(i, boundary);
            boundary += 1;
        }
    }
    let (left, right) = indices.split_at_mut(boundary);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(x, y, left, depth + 1, params, rng)),
        right: Box::new(grow(x, y, right, depth + 1, params, rng)),
    }
}

/// Search `max_features` non-constant features, drawn in random order.
#[allow(clippy::cast_precision_loss)]
fn best_split<R: Rng>(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    params: &GrowthParams,
    rng: &mut R,
) -> Option<BestSplit> {
    let n = indices.len();
    let total: f64 = indices.iter().map(|&i| y[i]).sum();

    let mut features: Vec<usize> = (0..x[indices[0]].len()).collect();
    features.shuffle(rng);

    let mut best: Option<BestSplit> = None;
    let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);
    let mut visited = 0;

    for feature in features {
        if visited >= params.max_features {
            break;
        }
        column.clear();
        column.extend(indices.iter().map(|&i| (x[i][feature], y[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));
        if column[0].0 == column[n - 1].0 || column[0].0.is_nan() {
            continue;
        }
        visited += 1;

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += column[k - 1].1;
            if k < params.min_samples_leaf || n - k < params.min_samples_leaf {
                continue;
            }
            let (lower, upper) = (column[k - 1].0, column[k].0);
            if lower == upper || !lower.is_finite() || !upper.is_finite() {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
            if best.as_ref().map_or(true, |b| score > b.score) {
                let mid = lower + (upper - lower) / 2.0;
                best = Some(BestSplit {
                    feature,
                    threshold: if mid < upper { mid } else { lower },
                    score,
                });
            }
        }
    }
    best
}

#[allow(clippy::cast_precision_loss)]
fn mean(y: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}
