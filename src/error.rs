//! Error types for crystal-props
//!
//! Data-quality problems (a structure that does not compile, a descriptor that
//! stays too short) are not errors: they are counted and skipped. Everything
//! here aborts the current run.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// crystal-props error types
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input (arguments, shapes, options)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Property tag not present in the catalogue
    #[error("Unknown property tag: {0}")]
    UnknownProperty(String),

    /// Retrieval collaborator failed
    #[error("Source error: {0}")]
    Source(String),

    /// Storage error (Parquet table or model document)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// No phase has both a usable descriptor and an averaged value
    #[error("Training table is empty: no phase has both a descriptor and a measured value")]
    EmptyTable,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
