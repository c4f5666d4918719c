//! # crystal-props: descriptor-based materials property regression
//!
//! Fetches scalar property measurements and crystal structures, turns every
//! structure into a numeric descriptor, reconciles descriptors of repeated
//! phases, joins them with per-phase averaged measurements and tunes a
//! random-forest regressor on the result.
//!
//! ## Stages
//!
//! - [`measurement`]: unit, interval and temperature filters
//! - [`aggregate`]: per-phase descriptor reconciliation
//! - [`table`]: training table, Arrow conversion
//! - [`quality`]: median scores over repeated random hold-out
//! - [`tune`]: two-stage grid search over tree count and features per split
//! - [`pipeline`]: orchestration over the [`source`] collaborators
//!
//! ## Example
//!
//! ```rust,no_run
//! use crystal_props::config::PipelineConfig;
//! use crystal_props::pipeline::Pipeline;
//! use crystal_props::source::JsonSource;
//!
//! let config = PipelineConfig::from_env()?;
//! let source = JsonSource::new(config.source_dir());
//! let report = Pipeline::new(source, config).run_property("z")?;
//!
//! println!("table: {}", report.table_handle.display());
//! println!("baseline MAE: {:.2}", report.baseline.mae);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod config;
pub mod crystal;
pub mod descriptor;
pub mod error;
pub mod forest;
pub mod measurement;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod property;
pub mod quality;
pub mod source;
pub mod storage;
pub mod table;
pub mod tracking;
pub mod tune;

pub use error::{Error, Result};

/// Phase identifier
pub type PhaseId = i64;
