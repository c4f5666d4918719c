//! Regression metrics
//!
//! Mean absolute error, coefficient of determination and the median used to
//! summarise repeated hold-out attempts.

/// Mean absolute error between targets and predictions.
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "Slices must have same length");
    assert!(!y_true.is_empty(), "Cannot compute MAE of empty slices");

    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum();
    total / y_true.len() as f64
}

/// Coefficient of determination, R² = 1 - `SS_res` / `SS_tot`.
///
/// A constant target gives 1.0 for a perfect prediction and 0.0 otherwise.
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len(), "Slices must have same length");
    assert!(!y_true.is_empty(), "Cannot compute R² of empty slices");

    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Median of `values`; the mean of the two middle values for even lengths.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Round to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(places).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}
