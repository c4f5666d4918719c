//! Training table
//!
//! Joins the per-phase averaged measurement values with the aggregated
//! descriptors. Phase ids are replaced by compound names on the way out, so the
//! table is what the regressor and the persistence layer see.

use crate::aggregate::PhaseDescriptorMap;
use crate::measurement::FilteredMeasurements;
use crate::{Error, PhaseId, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Float64Builder, ListArray, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Column holding compound names
pub const COMPOUND_COLUMN: &str = "Compound";
/// Column holding descriptor vectors
pub const DESCRIPTOR_COLUMN: &str = "Descriptor";
/// Column holding averaged property values
pub const VALUE_COLUMN: &str = "Avgvalue";

/// Phase id → compound name; the first name seen for a phase wins.
#[derive(Debug, Clone, Default)]
pub struct PhaseCompoundMap(FxHashMap<PhaseId, String>);

impl PhaseCompoundMap {
    /// Build from filtered measurements.
    #[must_use]
    pub fn from_measurements(measurements: &FilteredMeasurements) -> Self {
        let mut map = FxHashMap::default();
        for row in measurements.rows() {
            if let Some(phase) = row.phase {
                map.entry(phase).or_insert_with(|| row.compound.clone());
            }
        }
        Self(map)
    }

    /// Compound name of a phase.
    #[must_use]
    pub fn get(&self, phase_id: PhaseId) -> Option<&str> {
        self.0.get(&phase_id).map(String::as_str)
    }

    /// Number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Phase id → arithmetic mean of its filtered values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AveragedProperties(BTreeMap<PhaseId, f64>);

impl AveragedProperties {
    /// Group filtered measurements by phase and average their values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_measurements(measurements: &FilteredMeasurements) -> Self {
        let mut sums: BTreeMap<PhaseId, (f64, usize)> = BTreeMap::new();
        for row in measurements.rows() {
            if let Some(phase) = row.phase {
                let entry = sums.entry(phase).or_insert((0.0, 0));
                entry.0 += row.value;
                entry.1 += 1;
            }
        }
        Self(
            sums.into_iter()
                .map(|(phase, (sum, count))| (phase, sum / count as f64))
                .collect(),
        )
    }

    /// Averaged value of a phase.
    #[must_use]
    pub fn get(&self, phase_id: PhaseId) -> Option<f64> {
        self.0.get(&phase_id).copied()
    }

    /// Number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in ascending phase order.
    pub fn iter(&self) -> impl Iterator<Item = (PhaseId, f64)> + '_ {
        self.0.iter().map(|(&id, &v)| (id, v))
    }
}

/// One training example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    /// Compound name
    pub compound: String,
    /// Descriptor vector
    pub descriptor: Vec<f64>,
    /// Averaged property value (regression target)
    pub value: f64,
}

/// Descriptor/target table, one row per phase with both a descriptor and a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingTable {
    rows: Vec<TrainingRow>,
}

impl TrainingTable {
    /// Create a table from rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if descriptor lengths differ between rows.
    pub fn new(rows: Vec<TrainingRow>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let width = first.descriptor.len();
            if let Some(bad) = rows.iter().find(|r| r.descriptor.len() != width) {
                return Err(Error::InvalidInput(format!(
                    "Descriptor length mismatch: expected {width}, got {} for {}",
                    bad.descriptor.len(),
                    bad.compound
                )));
            }
        }
        Ok(Self { rows })
    }

    /// Join averaged values with descriptors, dropping phases without a
    /// descriptor, and relabel phases with compound names.
    ///
    /// Rows are produced in ascending phase order.
    #[must_use]
    pub fn build(
        averaged: &AveragedProperties,
        descriptors: &PhaseDescriptorMap,
        compounds: &PhaseCompoundMap,
    ) -> Self {
        let mut without_descriptor = 0usize;
        let mut rows = Vec::with_capacity(descriptors.len());

        for (phase_id, value) in averaged.iter() {
            let Some(descriptor) = descriptors.get(phase_id) else {
                without_descriptor += 1;
                continue;
            };
            let Some(compound) = compounds.get(phase_id) else {
                warn!(phase_id, "phase has no compound name, skipping");
                continue;
            };
            rows.push(TrainingRow {
                compound: compound.to_string(),
                descriptor: descriptor.to_vec(),
                value,
            });
        }

        info!(
            rows = rows.len(),
            without_descriptor, "joined descriptors with averaged values"
        );
        // every descriptor comes from the same uniform-width map
        Self { rows }
    }

    /// Build directly from filtered measurements and a descriptor map.
    #[must_use]
    pub fn from_parts(measurements: &FilteredMeasurements, descriptors: &PhaseDescriptorMap) -> Self {
        let averaged = AveragedProperties::from_measurements(measurements);
        let compounds = PhaseCompoundMap::from_measurements(measurements);
        Self::build(&averaged, descriptors, &compounds)
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[TrainingRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Shared descriptor length, `None` for an empty table.
    #[must_use]
    pub fn descriptor_len(&self) -> Option<usize> {
        self.rows.first().map(|r| r.descriptor.len())
    }

    /// Feature matrix (one descriptor per row).
    #[must_use]
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|r| r.descriptor.clone()).collect()
    }

    /// Target vector.
    #[must_use]
    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }

    /// Arrow schema of the persisted table.
    #[must_use]
    pub fn schema() -> Schema {
        Schema::new(vec![
            Field::new(COMPOUND_COLUMN, DataType::Utf8, false),
            Field::new(
                DESCRIPTOR_COLUMN,
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            ),
            Field::new(VALUE_COLUMN, DataType::Float64, false),
        ])
    }

    /// Convert to a single Arrow record batch.
    ///
    /// # Errors
    ///
    /// Returns error if Arrow rejects the assembled columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let compounds = StringArray::from_iter_values(self.rows.iter().map(|r| r.compound.as_str()));

        let mut descriptors = ListBuilder::new(Float64Builder::new());
        for row in &self.rows {
            descriptors.values().append_slice(&row.descriptor);
            descriptors.append(true);
        }

        let values = Float64Array::from_iter_values(self.rows.iter().map(|r| r.value));

        let columns: Vec<ArrayRef> = vec![
            Arc::new(compounds),
            Arc::new(descriptors.finish()),
            Arc::new(values),
        ];
        Ok(RecordBatch::try_new(Arc::new(Self::schema()), columns)?)
    }

    /// Rebuild a table from record batches with the persisted schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] if a column is missing or has the wrong
    /// type, and [`Error::InvalidInput`] if descriptor lengths differ.
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut rows = Vec::new();
        for batch in batches {
            let compounds = column::<StringArray>(batch, COMPOUND_COLUMN)?;
            let descriptors = column::<ListArray>(batch, DESCRIPTOR_COLUMN)?;
            let values = column::<Float64Array>(batch, VALUE_COLUMN)?;

            for i in 0..batch.num_rows() {
                if descriptors.is_null(i) || values.is_null(i) {
                    continue;
                }
                let list = descriptors.value(i);
                let items = list.as_any().downcast_ref::<Float64Array>().ok_or_else(|| {
                    Error::StorageError(format!(
                        "{DESCRIPTOR_COLUMN} items are {:?}, expected Float64",
                        list.data_type()
                    ))
                })?;
                if items.null_count() > 0 {
                    return Err(Error::StorageError(format!(
                        "{DESCRIPTOR_COLUMN} in row {i} has {} null items",
                        items.null_count()
                    )));
                }
                let descriptor = items.values().to_vec();
                rows.push(TrainingRow {
                    compound: compounds.value(i).to_string(),
                    descriptor,
                    value: values.value(i),
                });
            }
        }
        Self::new(rows)
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::StorageError(format!("Column not found: {name}")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| Error::StorageError(format!("Column {name} has an unexpected type")))
}
