//! Pipeline configuration
//!
//! Defaults, then environment overrides, then explicit builder calls:
//!
//! | Variable                   | Default    |
//! |----------------------------|------------|
//! | `CRYSTAL_PROPS_DATA_DIR`   | `./data`   |
//! | `CRYSTAL_PROPS_SOURCE_DIR` | `./source` |
//! | `CRYSTAL_PROPS_SEED`       | unseeded   |

use crate::descriptor::{DEFAULT_KAPPA, MAX_KAPPA};
use crate::quality::QualityOptions;
use crate::tune::TuningGrid;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Data directory variable
pub const DATA_DIR_ENV: &str = "CRYSTAL_PROPS_DATA_DIR";
/// Source directory variable
pub const SOURCE_DIR_ENV: &str = "CRYSTAL_PROPS_SOURCE_DIR";
/// Seed variable
pub const SEED_ENV: &str = "CRYSTAL_PROPS_SEED";

/// Settings shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    kappa: Option<u32>,
    data_dir: PathBuf,
    source_dir: PathBuf,
    quality: QualityOptions,
    grid: TuningGrid,
    seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kappa: None,
            data_dir: PathBuf::from("./data"),
            source_dir: PathBuf::from("./source"),
            quality: QualityOptions::default(),
            grid: TuningGrid::default(),
            seed: None,
        }
    }
}

impl PipelineConfig {
    /// Create a builder starting from defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(Self::default())
    }

    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `CRYSTAL_PROPS_SEED` is not an
    /// unsigned integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides taken from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the seed value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(SOURCE_DIR_ENV) {
            config.source_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(SEED_ENV) {
            let seed = raw.trim().parse().map_err(|e| {
                Error::InvalidInput(format!("{SEED_ENV} must be an unsigned integer, got {raw:?}: {e}"))
            })?;
            config.seed = Some(seed);
        }
        Ok(config)
    }

    /// Requested descriptor kappa, `None` for the descriptor default.
    #[must_use]
    pub const fn kappa(&self) -> Option<u32> {
        self.kappa
    }

    /// Kappa passed to the descriptor function.
    #[must_use]
    pub fn effective_kappa(&self) -> u32 {
        self.kappa.unwrap_or(DEFAULT_KAPPA)
    }

    /// Directory for persisted tables and models.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory read by the file-backed source.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Hold-out options, with the pipeline seed applied if set.
    #[must_use]
    pub fn quality(&self) -> QualityOptions {
        match self.seed {
            Some(seed) => self.quality.with_seed(seed),
            None => self.quality,
        }
    }

    /// Tuning grids.
    #[must_use]
    pub const fn grid(&self) -> &TuningGrid {
        &self.grid
    }

    /// Pipeline seed.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// Parse a command-line kappa.
///
/// Anything but an unsigned integer in `1..=MAX_KAPPA` yields `None`, which
/// leaves the descriptor default in place.
#[must_use]
pub fn parse_kappa(raw: &str) -> Option<u32> {
    raw.trim()
        .parse()
        .ok()
        .filter(|kappa| (1..=MAX_KAPPA).contains(kappa))
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration, e.g. [`PipelineConfig::from_env`].
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Descriptor kappa, capped at [`MAX_KAPPA`].
    #[must_use]
    pub const fn kappa(mut self, kappa: u32) -> Self {
        self.config.kappa = Some(if kappa > MAX_KAPPA { MAX_KAPPA } else { kappa });
        self
    }

    /// Data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Source directory.
    #[must_use]
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.source_dir = dir.into();
        self
    }

    /// Hold-out options.
    #[must_use]
    pub const fn quality(mut self, quality: QualityOptions) -> Self {
        self.config.quality = quality;
        self
    }

    /// Tuning grids.
    #[must_use]
    pub fn grid(mut self, grid: TuningGrid) -> Self {
        self.config.grid = grid;
        self
    }

    /// Seed for splits and forests.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
