//! Storage tests: Parquet training tables written by other tools
//!
//! 1. Hand-written Parquet file with the training-table schema loads
//! 2. Multiple row groups are concatenated in order
//! 3. Files with a foreign schema are rejected

use arrow::array::{Float64Array, Float64Builder, Int32Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use crystal_props::storage::TableStore;
use crystal_props::table::TrainingTable;
use crystal_props::Error;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Write `rows` training rows of width 4 in row groups of `group` rows
#[allow(clippy::cast_precision_loss)]
fn create_table_parquet(path: &Path, rows: usize, group: usize) -> Result<(), Box<dyn std::error::Error>> {
    let compounds = StringArray::from_iter_values((0..rows).map(|i| format!("C{i}")));
    let mut descriptors = ListBuilder::new(Float64Builder::new());
    for i in 0..rows {
        descriptors.values().append_slice(&[i as f64, 1.0, 2.0, 3.0]);
        descriptors.append(true);
    }
    let values = Float64Array::from_iter_values((0..rows).map(|i| i as f64 * 0.5));

    let schema = Arc::new(TrainingTable::schema());
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(compounds),
            Arc::new(descriptors.finish()),
            Arc::new(values),
        ],
    )?;

    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_max_row_group_size(group)
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

#[test]
fn test_load_hand_written_table() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dfz_external.parquet");
    create_table_parquet(&path, 1_000, 300).expect("Failed to create test Parquet file");

    let table = TableStore::load_table(&path).expect("Failed to load Parquet file");

    assert_eq!(table.len(), 1_000);
    assert_eq!(table.descriptor_len(), Some(4));
    assert_eq!(table.rows()[0].compound, "C0");
    assert_eq!(table.rows()[999].compound, "C999");
    assert!((table.rows()[999].descriptor[0] - 999.0).abs() < f64::EPSILON);
    assert!((table.rows()[10].value - 5.0).abs() < f64::EPSILON);
}

#[test]
fn test_foreign_schema_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dfz_foreign.parquet");

    let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int32, false)]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(Int32Array::from(vec![1, 2, 3]))])
        .unwrap();
    let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let err = TableStore::load_table(&path).unwrap_err();
    assert!(matches!(err, Error::StorageError(_)));
}

#[test]
fn test_not_parquet_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dfz_text.parquet");
    std::fs::write(&path, "not a parquet file").unwrap();

    let err = TableStore::load_table(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse Parquet file"));
}
