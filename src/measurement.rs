//! Measurement records and the filter stage
//!
//! Raw rows arrive from the retrieval collaborator with the column names
//! `Compound, Phase, Value, Units, Cunits, Cname, Cvalue`. The filter keeps only
//! rows that can be trusted for averaging:
//!
//! 1. the row carries a phase id
//! 2. the units match the property's expected units
//! 3. the value lies strictly inside the property's interval
//! 4. unless the property is temperature-exempt, a Kelvin temperature
//!    condition must lie within [`TEMPERATURE_WINDOW_K`]

use crate::property::PropertySemantics;
use crate::PhaseId;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

/// Accepted measurement temperatures (inclusive), in Kelvin
pub const TEMPERATURE_WINDOW_K: (f64, f64) = (200.0, 400.0);

const TEMPERATURE_CONDITION: &str = "Temperature";
const KELVIN: &str = "K";

/// A single measurement row as produced by the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Compound name (chemical formula)
    #[serde(rename = "Compound")]
    pub compound: String,
    /// Phase identifier, absent for rows not tied to a phase
    #[serde(rename = "Phase", default)]
    pub phase: Option<PhaseId>,
    /// Scalar value; non-numeric values are read as NaN
    #[serde(rename = "Value", deserialize_with = "lenient_f64")]
    pub value: f64,
    /// Value units
    #[serde(rename = "Units")]
    pub units: String,
    /// Condition units
    #[serde(rename = "Cunits", default)]
    pub condition_units: Option<String>,
    /// Condition name
    #[serde(rename = "Cname", default)]
    pub condition_name: Option<String>,
    /// Condition value
    #[serde(rename = "Cvalue", default)]
    pub condition_value: Option<f64>,
}

impl MeasurementRecord {
    /// Create a record without a measurement condition.
    #[must_use]
    pub fn new(
        compound: impl Into<String>,
        phase: PhaseId,
        value: f64,
        units: impl Into<String>,
    ) -> Self {
        Self {
            compound: compound.into(),
            phase: Some(phase),
            value,
            units: units.into(),
            condition_units: None,
            condition_name: None,
            condition_value: None,
        }
    }

    /// Attach a measurement condition.
    #[must_use]
    pub fn with_condition(
        mut self,
        name: impl Into<String>,
        units: impl Into<String>,
        value: f64,
    ) -> Self {
        self.condition_name = Some(name.into());
        self.condition_units = Some(units.into());
        self.condition_value = Some(value);
        self
    }

    /// Whether the row was measured outside the near-room-temperature window.
    ///
    /// Rows without a Kelvin temperature condition are never out of window.
    #[must_use]
    pub fn outside_temperature_window(&self) -> bool {
        let is_kelvin_temperature = self.condition_name.as_deref() == Some(TEMPERATURE_CONDITION)
            && self.condition_units.as_deref() == Some(KELVIN);
        match (is_kelvin_temperature, self.condition_value) {
            (true, Some(t)) => t < TEMPERATURE_WINDOW_K.0 || t > TEMPERATURE_WINDOW_K.1,
            _ => false,
        }
    }
}

/// Values may be delivered as numbers, numeric strings, out-of-range markers
/// or null.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

/// Row counts removed by each filter rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Rows received
    pub fetched: usize,
    /// Dropped: no phase id
    pub without_phase: usize,
    /// Dropped: unexpected units
    pub wrong_units: usize,
    /// Dropped: value outside the property interval
    pub out_of_interval: usize,
    /// Dropped: temperature condition outside the window
    pub temperature: usize,
    /// Rows kept
    pub kept: usize,
}

/// Measurements that passed every filter rule.
#[derive(Debug, Clone, Default)]
pub struct FilteredMeasurements {
    rows: Vec<MeasurementRecord>,
    report: FilterReport,
}

impl FilteredMeasurements {
    /// Kept rows, in arrival order.
    #[must_use]
    pub fn rows(&self) -> &[MeasurementRecord] {
        &self.rows
    }

    /// Per-rule drop counts.
    #[must_use]
    pub const fn report(&self) -> FilterReport {
        self.report
    }

    /// Number of kept rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct phase ids, ascending.
    #[must_use]
    pub fn phases(&self) -> Vec<PhaseId> {
        let mut phases: Vec<PhaseId> = self.rows.iter().filter_map(|r| r.phase).collect();
        phases.sort_unstable();
        phases.dedup();
        phases
    }
}

/// Apply the unit, interval and temperature rules for `property`.
#[must_use]
pub fn filter_measurements(
    records: Vec<MeasurementRecord>,
    property: &PropertySemantics,
) -> FilteredMeasurements {
    let mut report = FilterReport {
        fetched: records.len(),
        ..FilterReport::default()
    };

    let rows: Vec<MeasurementRecord> = records
        .into_iter()
        .filter(|r| {
            if r.phase.is_none() {
                report.without_phase += 1;
                false
            } else if r.units != property.units {
                report.wrong_units += 1;
                false
            } else if !property.accepts(r.value) {
                report.out_of_interval += 1;
                false
            } else if !property.temperature_exempt && r.outside_temperature_window() {
                report.temperature += 1;
                false
            } else {
                true
            }
        })
        .collect();

    report.kept = rows.len();
    info!(
        property = property.name,
        "Rows to neglect by temperature: {}", report.temperature
    );
    debug!(?report, "measurement filter");

    FilteredMeasurements { rows, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property;

    fn bulk_modulus() -> &'static PropertySemantics {
        property::find('z').unwrap()
    }

    #[test]
    fn test_drops_rows_outside_temperature_window() {
        let rows = vec![
            MeasurementRecord::new("NaCl", 1, 24.0, "GPa").with_condition("Temperature", "K", 350.0),
            MeasurementRecord::new("NaCl", 1, 30.0, "GPa").with_condition("Temperature", "K", 450.0),
        ];

        let filtered = filter_measurements(rows, bulk_modulus());

        assert_eq!(filtered.len(), 1);
        assert!((filtered.rows()[0].value - 24.0).abs() < f64::EPSILON);
        assert_eq!(filtered.report().temperature, 1);
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let rows = vec![
            MeasurementRecord::new("A", 1, 5.0, "GPa").with_condition("Temperature", "K", 200.0),
            MeasurementRecord::new("A", 1, 5.0, "GPa").with_condition("Temperature", "K", 400.0),
            MeasurementRecord::new("A", 1, 5.0, "GPa").with_condition("Temperature", "K", 199.9),
        ];
        let filtered = filter_measurements(rows, bulk_modulus());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_temperature_rule_needs_kelvin() {
        let rows = vec![
            MeasurementRecord::new("A", 1, 5.0, "GPa").with_condition("Temperature", "C", 900.0),
            MeasurementRecord::new("A", 1, 5.0, "GPa").with_condition("Pressure", "K", 900.0),
        ];
        let filtered = filter_measurements(rows, bulk_modulus());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_exempt_property_keeps_hot_rows() {
        let melting = property::find('m').unwrap();
        let rows = vec![
            MeasurementRecord::new("Fe", 7, 1811.0, "K").with_condition("Temperature", "K", 1811.0),
        ];
        let filtered = filter_measurements(rows, melting);
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_unit_mismatch_excluded() {
        let rows = vec![
            MeasurementRecord::new("MgO", 3, 160.0, "GPa"),
            MeasurementRecord::new("MgO", 3, 1.6e11, "Pa"),
        ];
        let filtered = filter_measurements(rows, bulk_modulus());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.report().wrong_units, 1);
    }

    #[test]
    fn test_interval_and_missing_phase() {
        let mut orphan = MeasurementRecord::new("X", 0, 10.0, "GPa");
        orphan.phase = None;
        let rows = vec![
            orphan,
            MeasurementRecord::new("Y", 2, 0.5, "GPa"),
            MeasurementRecord::new("Y", 2, f64::NAN, "GPa"),
            MeasurementRecord::new("Y", 2, 12.0, "GPa"),
        ];
        let filtered = filter_measurements(rows, bulk_modulus());
        let report = filtered.report();
        assert_eq!(report.fetched, 4);
        assert_eq!(report.without_phase, 1);
        assert_eq!(report.out_of_interval, 2);
        assert_eq!(report.kept, 1);
        assert_eq!(filtered.phases(), vec![2]);
    }

    #[test]
    fn test_deserialize_lenient_values() {
        let json = r#"[
            {"Compound": "Si", "Phase": 5, "Value": "12.5", "Units": "GPa"},
            {"Compound": "Si", "Phase": 5, "Value": ">1000", "Units": "GPa",
             "Cunits": "K", "Cname": "Temperature", "Cvalue": 300},
            {"Compound": "Si", "Phase": null, "Value": 3, "Units": "GPa"}
        ]"#;
        let rows: Vec<MeasurementRecord> = serde_json::from_str(json).unwrap();
        assert!((rows[0].value - 12.5).abs() < f64::EPSILON);
        assert!(rows[1].value.is_nan());
        assert_eq!(rows[1].condition_value, Some(300.0));
        assert_eq!(rows[2].phase, None);
    }
}
