//! Persistence of training tables (Parquet) and models (JSON)
//!
//! Handles are plain file paths inside the store root. Table files are named
//! `df{tag}_{timestamp}.parquet` and model files `ml{tag}_{timestamp}.json`,
//! so the property tag can be recovered from a table handle alone
//! (see [`crate::tune::infer_tag`]).

use crate::model::FittedModel;
use crate::table::TrainingTable;
use crate::tracking::TrialLog;
use crate::{Error, Result};
use chrono::Utc;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows per Parquet row group
const ROW_GROUP_SIZE: usize = 4096;

/// A persisted model together with the trials that selected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    /// Fitted model
    pub model: FittedModel,
    /// Every candidate evaluation of the tuning run
    pub trials: TrialLog,
}

/// File-system store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    /// Store writing under `root`; the directory is created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn handle(&self, prefix: &str, tag: char, extension: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).map_err(|e| {
            Error::StorageError(format!(
                "Failed to create data directory {}: {e}",
                self.root.display()
            ))
        })?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
        Ok(self.root.join(format!("{prefix}{tag}_{stamp}.{extension}")))
    }

    /// Write `table` as Parquet and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] if the file cannot be written.
    pub fn save_table(&self, table: &TrainingTable, tag: char) -> Result<PathBuf> {
        let path = self.handle("df", tag, "parquet")?;
        let batch = table.to_record_batch()?;

        let file = File::create(&path)
            .map_err(|e| Error::StorageError(format!("Failed to create Parquet file: {e}")))?;
        let props = WriterProperties::builder()
            .set_max_row_group_size(ROW_GROUP_SIZE)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| Error::StorageError(format!("Failed to create Parquet writer: {e}")))?;
        writer
            .write(&batch)
            .map_err(|e| Error::StorageError(format!("Failed to write record batch: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::StorageError(format!("Failed to finish Parquet file: {e}")))?;

        info!(path = %path.display(), rows = table.len(), "Saving table");
        Ok(path)
    }

    /// Read a table written by [`TableStore::save_table`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] if the file cannot be read or does not
    /// have the training-table schema.
    pub fn load_table(path: impl AsRef<Path>) -> Result<TrainingTable> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::StorageError(format!("Failed to open Parquet file: {e}")))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?
            .build()
            .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
        TrainingTable::from_record_batches(&batches)
    }

    /// Write a model and its trial log as JSON and return the handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] if the file cannot be written.
    pub fn save_model(&self, model: &FittedModel, trials: &TrialLog, tag: char) -> Result<PathBuf> {
        let path = self.handle("ml", tag, "json")?;
        let file = File::create(&path)
            .map_err(|e| Error::StorageError(format!("Failed to create model file: {e}")))?;

        let stored = StoredModelRef { model, trials };
        serde_json::to_writer(BufWriter::new(file), &stored)
            .map_err(|e| Error::StorageError(format!("Failed to write model: {e}")))?;

        info!(path = %path.display(), "Saving model");
        Ok(path)
    }

    /// Read a model written by [`TableStore::save_model`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] if the file cannot be read or parsed.
    pub fn load_model(path: impl AsRef<Path>) -> Result<StoredModel> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::StorageError(format!("Failed to open model file: {e}")))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::StorageError(format!("Failed to parse model file: {e}")))
    }
}

#[derive(Serialize)]
struct StoredModelRef<'a> {
    model: &'a FittedModel,
    trials: &'a TrialLog,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::RegressorConfig;
    use crate::model::ModelMetadata;
    use crate::table::TrainingRow;
    use crate::tracking::{TrialRecord, TuningStage};

    fn store(name: &str) -> TableStore {
        let root = std::env::temp_dir().join(format!("crystal_props_store_{name}"));
        let _ = fs::remove_dir_all(&root);
        TableStore::new(root)
    }

    fn table() -> TrainingTable {
        TrainingTable::new(
            (0..12)
                .map(|i| TrainingRow {
                    compound: format!("C{i}"),
                    descriptor: vec![f64::from(i), f64::from(i) * 0.5, 1.0],
                    value: f64::from(i) * 2.0,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_table_round_trip() {
        let store = store("table");
        let table = table();

        let path = store.save_table(&table, 'z').unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("dfz_"));
        assert!(name.ends_with(".parquet"));

        let loaded = TableStore::load_table(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_load_missing_table() {
        let err = TableStore::load_table("/nonexistent/dfz_missing.parquet").unwrap_err();
        assert!(matches!(err, Error::StorageError(_)));
    }

    #[test]
    fn test_model_round_trip() {
        let store = store("model");
        let table = table();
        let forest = RegressorConfig::new(3, 2)
            .with_seed(4)
            .fit(&table.features(), &table.targets())
            .unwrap();
        let model = FittedModel::new(
            forest,
            ModelMetadata {
                mae: 1.25,
                r2: 0.75,
                n_estimators: 3,
                max_features: 2,
                tag: Some('x'),
                created_at: Utc::now(),
            },
        );
        let mut trials = TrialLog::new();
        trials.add_trial(TrialRecord::new("run", TuningStage::TreeCount, 3, 1.25, 0.75));

        let path = store.save_model(&model, &trials, 'x').unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("mlx_"));

        let stored = TableStore::load_model(&path).unwrap();
        assert_eq!(stored.trials.len(), 1);
        assert_eq!(stored.model.metadata().n_estimators, 3);
        assert_eq!(stored.model.metadata().tag, Some('x'));
        assert_eq!(stored.model.forest().trees().len(), 3);
    }
}
