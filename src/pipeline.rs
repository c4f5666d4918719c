//! End-to-end orchestration
//!
//! ```text
//! fetch measurements → filter → distinct phases → stream structures
//!   → aggregate descriptors → training table → save (handle)
//!   → baseline estimate → tune from handle → save model
//! ```

use crate::aggregate::{aggregate_descriptors, AggregationStats};
use crate::config::PipelineConfig;
use crate::crystal::{CellCompiler, CrystalCompiler};
use crate::descriptor::{DescriptorFn, RadialDescriptor};
use crate::forest::RegressorConfig;
use crate::measurement::{filter_measurements, FilterReport};
use crate::property::{self, PropertySemantics};
use crate::quality::{estimate_quality, QualityEstimate};
use crate::source::{MeasurementSource, StructureQuery, StructureSource};
use crate::storage::TableStore;
use crate::table::TrainingTable;
use crate::tune::{infer_tag, Tuner, TuningOutcome};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// What happened while building a training table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Measurement filter counts
    pub filter: FilterReport,
    /// Distinct phases among the kept measurements
    pub phases: usize,
    /// Descriptor aggregation counts
    pub aggregation: AggregationStats,
    /// Uniform descriptor length of the table
    pub descriptor_len: usize,
    /// Rows in the training table
    pub rows: usize,
}

/// Result of tuning a persisted table.
#[derive(Debug, Clone)]
pub struct TuneReport {
    /// Model, trials and run record
    pub outcome: TuningOutcome,
    /// Saved model, `None` when no tag could be inferred (dry run)
    pub model_handle: Option<PathBuf>,
}

/// Result of a full property run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Saved training table
    pub table_handle: PathBuf,
    /// Build counters
    pub build: BuildReport,
    /// Estimate of the default regressor configuration
    pub baseline: QualityEstimate,
    /// Tuning result
    pub tuning: TuneReport,
}

/// What a command-line target refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Known property tag: fetch, build and tune
    Property(&'static PropertySemantics),
    /// Existing saved table: tune only
    Table(PathBuf),
}

impl Target {
    /// Resolve a command-line argument. Tags take precedence over paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the argument is missing, or is
    /// neither a known tag nor an existing path.
    pub fn resolve(arg: Option<&str>) -> Result<Self> {
        let Some(arg) = arg else {
            return Err(Error::InvalidInput(format!(
                "What to do?\n\
                 Please, provide either a property tag ({}) for property data to be fetched and fitted,\n\
                 or a saved table file for tuning the model.",
                property::known_tags()
            )));
        };
        if let Ok(property) = property::lookup(arg) {
            return Ok(Self::Property(property));
        }
        let path = Path::new(arg);
        if path.exists() {
            return Ok(Self::Table(path.to_path_buf()));
        }
        Err(Error::InvalidInput(format!("Unrecognized argument: {arg}")))
    }
}

/// Fetch-to-model pipeline over pluggable collaborators.
#[derive(Debug, Clone)]
pub struct Pipeline<S, C = CellCompiler, D = RadialDescriptor> {
    source: S,
    compiler: C,
    descriptor: D,
    config: PipelineConfig,
    store: TableStore,
}

impl<S> Pipeline<S> {
    /// Pipeline using the built-in crystal compiler and descriptor.
    #[must_use]
    pub fn new(source: S, config: PipelineConfig) -> Self {
        Self::with_collaborators(source, CellCompiler, RadialDescriptor, config)
    }
}

impl<S, C, D> Pipeline<S, C, D> {
    /// Pipeline with explicit collaborators.
    #[must_use]
    pub fn with_collaborators(source: S, compiler: C, descriptor: D, config: PipelineConfig) -> Self {
        let store = TableStore::new(config.data_dir());
        Self {
            source,
            compiler,
            descriptor,
            config,
            store,
        }
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Persistence store.
    #[must_use]
    pub const fn store(&self) -> &TableStore {
        &self.store
    }
}

impl<S, C, D> Pipeline<S, C, D>
where
    S: MeasurementSource + StructureSource,
    C: CrystalCompiler,
    D: DescriptorFn,
{
    /// Fetch, filter and aggregate into a training table.
    ///
    /// # Errors
    ///
    /// Returns any retrieval error; data-quality problems are only counted.
    pub fn build_table(&self, property: &PropertySemantics) -> Result<(TrainingTable, BuildReport)> {
        let kappa = self.config.effective_kappa();
        info!("Getting {} with descriptor kappa = {}", property.name, kappa);
        let started = Instant::now();

        let raw = self.source.fetch_measurements(property)?;
        let filtered = filter_measurements(raw, property);
        let phases = filtered.phases();
        info!("Got {} distinct crystalline phases", phases.len());

        let query = StructureQuery::for_phases(phases.clone());
        let stream = self.source.fetch_structures(&query)?;
        let (descriptors, aggregation) =
            aggregate_descriptors(stream, &self.compiler, &self.descriptor, kappa)?;

        let table = TrainingTable::from_parts(&filtered, &descriptors);
        info!(
            "Done {} rows in {:.2} sc",
            table.len(),
            started.elapsed().as_secs_f64()
        );

        let report = BuildReport {
            filter: filtered.report(),
            phases: phases.len(),
            aggregation,
            descriptor_len: table.descriptor_len().unwrap_or(0),
            rows: table.len(),
        };
        Ok((table, report))
    }

    /// Full run for a property tag: build, save, estimate the default
    /// configuration, then tune from the saved table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProperty`] for an unknown tag,
    /// [`Error::EmptyTable`] when nothing can be trained on, and any
    /// retrieval, storage or estimation error.
    pub fn run_property(&self, tag: &str) -> Result<PipelineReport> {
        let property = property::lookup(tag)?;
        let (table, build) = self.build_table(property)?;
        if table.is_empty() {
            return Err(Error::EmptyTable);
        }

        let table_handle = self.store.save_table(&table, property.tag)?;

        let baseline_config = match self.config.seed() {
            Some(seed) => RegressorConfig::default().with_seed(seed),
            None => RegressorConfig::default(),
        };
        let baseline = estimate_quality(
            &baseline_config,
            &table.features(),
            &table.targets(),
            &self.config.quality(),
        )?;
        info!("Avg. MAE: {:.2}", baseline.mae);
        info!("Avg. R2 score: {:.2}", baseline.r2);

        let tuning = tune_table_file(&self.config, &table_handle)?;
        Ok(PipelineReport {
            table_handle,
            build,
            baseline,
            tuning,
        })
    }
}

/// Tune a persisted table; the model is saved only when the file name
/// reveals the property tag.
///
/// # Errors
///
/// Returns any storage or tuning error.
pub fn tune_table_file(config: &PipelineConfig, path: &Path) -> Result<TuneReport> {
    let tag = infer_tag(path);
    match tag.and_then(property::find) {
        Some(property) => info!("Detected property {}", property.name),
        None => info!("No property name detected"),
    }

    let table = TableStore::load_table(path)?;
    let tuner = Tuner::new(config.grid().clone(), config.quality());
    let outcome = tuner.tune(&table, tag)?;
    let meta = outcome.model.metadata();
    info!("a = {} b = {}", meta.n_estimators, meta.max_features);

    let model_handle = match tag {
        Some(tag) => Some(TableStore::new(config.data_dir()).save_model(
            &outcome.model,
            &outcome.trials,
            tag,
        )?),
        None => None,
    };

    Ok(TuneReport {
        outcome,
        model_handle,
    })
}
