//! crystal-props CLI
//!
//! ```text
//! crystal-props <TAG|TABLE> [KAPPA]
//! ```
//!
//! A known property tag runs the whole pipeline; a path to a saved table only
//! runs the tuning stage.

use anyhow::{Context, Result};
use clap::Parser;
use crystal_props::config::{parse_kappa, PipelineConfig, PipelineConfigBuilder};
use crystal_props::pipeline::{tune_table_file, Pipeline, Target, TuneReport};
use crystal_props::property;
use crystal_props::source::JsonSource;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "crystal_props=info";

/// Fit and tune property regressors on crystal-structure descriptors
///
/// Examples:
///   crystal-props z                          # fetch bulk modulus data, fit, tune
///   crystal-props z 12                       # same with descriptor kappa 12
///   crystal-props data/dfz_20240101.parquet  # tune a saved table
#[derive(Parser, Debug)]
#[command(name = "crystal-props")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Property tag to fetch and fit, or a saved table file to tune
    #[arg(value_name = "TAG|TABLE")]
    target: Option<String>,

    /// Descriptor kappa; anything but an unsigned integer keeps the default
    #[arg(value_name = "KAPPA")]
    kappa: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let target = Target::resolve(cli.target.as_deref())?;

    let mut builder = PipelineConfigBuilder::new(PipelineConfig::from_env()?);
    if let Some(kappa) = cli.kappa.as_deref().and_then(parse_kappa) {
        builder = builder.kappa(kappa);
    }
    let config = builder.build();

    match target {
        Target::Property(property) => {
            let tag = property.tag.to_string();
            let source = JsonSource::new(config.source_dir());
            let report = Pipeline::new(source, config)
                .run_property(&tag)
                .with_context(|| format!("pipeline for property {tag} failed"))?;
            println!("table: {}", report.table_handle.display());
            println!(
                "baseline: MAE {}, R2 {:.2}",
                property.format_value(report.baseline.mae),
                report.baseline.r2
            );
            print_tuning(&report.tuning);
        }
        Target::Table(path) => {
            let report = tune_table_file(&config, &path)
                .with_context(|| format!("tuning {} failed", path.display()))?;
            print_tuning(&report);
        }
    }

    Ok(())
}

fn print_tuning(report: &TuneReport) {
    let meta = report.outcome.model.metadata();
    let mae = match meta.tag.and_then(property::find) {
        Some(property) => property.format_value(meta.mae),
        None => format!("{:.2}", meta.mae),
    };
    println!(
        "model: trees {} features {} MAE {mae} R2 {:.2}",
        meta.n_estimators, meta.max_features, meta.r2
    );
    match &report.model_handle {
        Some(path) => println!("saved: {}", path.display()),
        None => println!("dry run, model not saved"),
    }
}
