//! Tuning on a synthetic descriptor table
//!
//! 100 rows of 200-element descriptors, every element a monotone function of a
//! latent variable, target linear in the first element.

use crystal_props::forest::RegressorConfig;
use crystal_props::quality::{estimate_quality, QualityOptions};
use crystal_props::table::{TrainingRow, TrainingTable};
use crystal_props::tracking::{RunStatus, TrialLog, TuningStage};
use crystal_props::tune::{Tuner, TuningGrid};

const ROWS: usize = 100;
const WIDTH: usize = 200;

#[allow(clippy::cast_precision_loss)]
fn synthetic_table() -> TrainingTable {
    let rows = (0..ROWS)
        .map(|i| {
            let t = i as f64 / 10.0;
            let descriptor: Vec<f64> = (0..WIDTH)
                .map(|j| t * (1.0 + j as f64 / WIDTH as f64))
                .collect();
            let value = 3.0 * descriptor[0] + 1.0;
            TrainingRow {
                compound: format!("C{i}"),
                descriptor,
                value,
            }
        })
        .collect();
    TrainingTable::new(rows).unwrap()
}

fn options() -> QualityOptions {
    QualityOptions::default().with_attempts(5).with_seed(2024)
}

#[test]
fn test_stage_one_beats_single_tree() {
    let table = synthetic_table();
    let (features, targets) = (table.features(), table.targets());

    let tuner = Tuner::new(TuningGrid::new(vec![20, 40, 60], vec![1, 2]), options());
    let mut trials = TrialLog::new();
    let best = tuner
        .search_tree_counts(&features, &targets, "synthetic", &mut trials)
        .unwrap();

    let single_tree = estimate_quality(
        &RegressorConfig::new(1, 2).with_seed(2024),
        &features,
        &targets,
        &options(),
    )
    .unwrap();

    assert!([20, 40, 60].contains(&best.parameter));
    assert!(
        best.estimate.mae < single_tree.mae,
        "best stage-1 MAE {} should beat single-tree MAE {}",
        best.estimate.mae,
        single_tree.mae
    );
    assert_eq!(trials.trials_for_stage(TuningStage::TreeCount).len(), 3);
}

#[test]
fn test_full_tuning_run() {
    let table = synthetic_table();
    let tuner = Tuner::new(TuningGrid::new(vec![20, 40], vec![1, 2, 3]), options());

    let outcome = tuner.tune(&table, None).unwrap();

    assert_eq!(outcome.run.status(), RunStatus::Success);
    assert_eq!(outcome.run.tag(), None);
    assert!(outcome.run.ended_at().is_some());
    assert_eq!(outcome.trials.len(), 5);
    assert_eq!(outcome.trials.trials_for_stage(TuningStage::FeatureSplit).len(), 3);

    let meta = outcome.model.metadata();
    assert_eq!(meta.tag, None);
    assert!(meta.r2 > 0.8, "R2 {} unexpectedly low", meta.r2);
    assert!((meta.r2 * 100.0 - (meta.r2 * 100.0).round()).abs() < 1e-9);

    let sample = &table.rows()[50];
    let predicted = outcome.model.predict(&sample.descriptor).unwrap();
    assert!((predicted - sample.value).abs() < 2.0);
}

#[test]
fn test_seeded_tuning_reproducible() {
    let table = synthetic_table();
    let tuner = Tuner::new(TuningGrid::new(vec![20, 40], vec![1, 2]), options());

    let first = tuner.tune(&table, Some('z')).unwrap();
    let second = tuner.tune(&table, Some('z')).unwrap();

    let params = |log: &TrialLog| -> Vec<(usize, f64, f64)> {
        log.iter().map(|t| (t.parameter(), t.mae(), t.r2())).collect()
    };
    assert_eq!(params(&first.trials), params(&second.trials));
    assert_eq!(
        first.model.metadata().n_estimators,
        second.model.metadata().n_estimators
    );
}
