//! Property-based tests for crystal-props
//!
//! - Aggregation invariants (uniform width, shortest accepted length)
//! - Filter invariants (units, open interval)
//! - Selection and summary statistics
//! - Run with ProptestConfig::with_cases(100)

use crystal_props::aggregate::DescriptorAccumulator;
use crystal_props::measurement::{filter_measurements, MeasurementRecord};
use crystal_props::metrics::median;
use crystal_props::property;
use crystal_props::quality::{holdout_split, QualityEstimate};
use crystal_props::tune::{select_best, Candidate};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// Strategies
// ============================================================================

/// (phase id, descriptor length, fill value) observations
fn arb_observations() -> impl Strategy<Value = Vec<(i64, usize, f64)>> {
    proptest::collection::vec((0i64..12, 200usize..600, -50.0f64..50.0), 1..40)
}

fn arb_measurement() -> impl Strategy<Value = MeasurementRecord> {
    (
        0i64..20,
        -10.0f64..3000.0,
        prop_oneof![Just("GPa"), Just("Pa"), Just("K")],
        proptest::option::of(0.0f64..1000.0),
    )
        .prop_map(|(phase, value, units, temperature)| {
            let record = MeasurementRecord::new("X", phase, value, units);
            match temperature {
                Some(t) => record.with_condition("Temperature", "K", t),
                None => record,
            }
        })
}

fn arb_candidates() -> impl Strategy<Value = Vec<Candidate>> {
    proptest::collection::vec((1usize..500, 0.0f64..10.0, -1.0f64..1.0), 1..30).prop_map(|raw| {
        raw.into_iter()
            .map(|(parameter, mae, r2)| Candidate {
                parameter,
                estimate: QualityEstimate { mae, r2 },
            })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: every finished descriptor has the shortest observed length
    #[test]
    fn prop_aggregation_uniform_width(observations in arb_observations()) {
        let mut accumulator = DescriptorAccumulator::new();
        for &(phase, len, fill) in &observations {
            accumulator.observe(phase, vec![fill; len]);
        }
        let shortest = observations.iter().map(|o| o.1).min().unwrap();

        let map = accumulator.finish();
        prop_assert_eq!(map.descriptor_len(), shortest);
        for (_, descriptor) in map.iter() {
            prop_assert_eq!(descriptor.len(), shortest);
        }
    }

    /// Property: a phase seen once keeps its own values
    #[test]
    fn prop_single_observation_verbatim(len in 200usize..500, fill in -5.0f64..5.0) {
        let mut accumulator = DescriptorAccumulator::new();
        prop_assert!(!accumulator.observe(3, vec![fill; len]));
        let map = accumulator.finish();
        prop_assert!(map.get(3).unwrap().iter().all(|&v| (v - fill).abs() < 1e-12));
    }

    /// Property: kept rows always satisfy units and the open interval
    #[test]
    fn prop_filter_keeps_valid_rows(rows in proptest::collection::vec(arb_measurement(), 0..60)) {
        let bulk = property::find('z').unwrap();
        let total = rows.len();
        let filtered = filter_measurements(rows, bulk);

        for row in filtered.rows() {
            prop_assert_eq!(row.units.as_str(), "GPa");
            prop_assert!(row.value > 0.5 && row.value < 2000.0);
            prop_assert!(!row.outside_temperature_window());
        }

        let report = filtered.report();
        prop_assert_eq!(
            report.without_phase + report.wrong_units + report.out_of_interval
                + report.temperature + report.kept,
            total
        );
    }

    /// Property: median lies between min and max
    #[test]
    fn prop_median_bounded(values in proptest::collection::vec(-1e6f64..1e6, 1..50)) {
        let m = median(&values).unwrap();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(m >= min && m <= max);
    }

    /// Property: the selected candidate has the lowest MAE
    #[test]
    fn prop_select_best_minimises_mae(candidates in arb_candidates()) {
        let best = select_best(&candidates).unwrap();
        for c in &candidates {
            prop_assert!(best.estimate.mae <= c.estimate.mae);
        }
    }

    /// Property: hold-out split partitions all indices
    #[test]
    fn prop_holdout_partitions(n in 3usize..300, fraction in 0.05f64..0.6, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let (train, test) = holdout_split(n, fraction, &mut rng).unwrap();

        prop_assert!(!train.is_empty() && !test.is_empty());
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let expected_test = (n as f64 * fraction).ceil() as usize;
        prop_assert_eq!(test.len(), expected_test);

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
    }
}
