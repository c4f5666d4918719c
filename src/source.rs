//! Retrieval collaborators
//!
//! [`MeasurementSource`] delivers raw measurement rows for a property and
//! [`StructureSource`] streams structure records for a set of phases. The
//! pipeline only sees these traits; [`JsonSource`] is a file-backed
//! implementation over a local directory:
//!
//! - `measurements.json`: object mapping property name to an array of rows
//! - `structures.jsonl`: one structure record per line

use crate::crystal::StructureRecord;
use crate::measurement::MeasurementRecord;
use crate::property::PropertySemantics;
use crate::{Error, PhaseId, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File holding measurement rows keyed by property name
pub const MEASUREMENTS_FILE: &str = "measurements.json";
/// File holding one structure record per line
pub const STRUCTURES_FILE: &str = "structures.jsonl";

/// Lazily produced structure records.
pub type StructureStream<'a> = Box<dyn Iterator<Item = Result<StructureRecord>> + 'a>;

/// Fetches raw measurements for a property.
pub trait MeasurementSource {
    /// All measurement rows of `property`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Source`] (or an IO/JSON error) if retrieval fails.
    fn fetch_measurements(&self, property: &PropertySemantics) -> Result<Vec<MeasurementRecord>>;
}

/// Query for structure records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureQuery {
    /// Property selector
    pub props: String,
    /// Class selector
    pub classes: String,
    /// Requested phases
    pub phases: Vec<PhaseId>,
}

impl StructureQuery {
    /// Ordered, non-disordered atomic structures of `phases`.
    #[must_use]
    pub fn for_phases(phases: Vec<PhaseId>) -> Self {
        Self {
            props: "atomic structure".to_string(),
            classes: "non-disordered".to_string(),
            phases,
        }
    }
}

/// Streams structure records.
pub trait StructureSource {
    /// Records matching `query`, produced lazily.
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened; per-record failures are
    /// yielded as `Err` items.
    fn fetch_structures(&self, query: &StructureQuery) -> Result<StructureStream<'_>>;
}

/// Local directory source.
#[derive(Debug, Clone)]
pub struct JsonSource {
    dir: PathBuf,
}

impl JsonSource {
    /// Source reading from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Source directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open(&self, name: &str) -> Result<BufReader<File>> {
        let path = self.dir.join(name);
        File::open(&path)
            .map(BufReader::new)
            .map_err(|e| Error::Source(format!("Failed to open {}: {e}", path.display())))
    }
}

impl MeasurementSource for JsonSource {
    fn fetch_measurements(&self, property: &PropertySemantics) -> Result<Vec<MeasurementRecord>> {
        let reader = self.open(MEASUREMENTS_FILE)?;
        let mut by_property: FxHashMap<String, Vec<MeasurementRecord>> =
            serde_json::from_reader(reader)
                .map_err(|e| Error::Source(format!("Malformed {MEASUREMENTS_FILE}: {e}")))?;
        let rows = by_property.remove(property.name).unwrap_or_default();
        info!(property = property.name, rows = rows.len(), "fetched measurements");
        Ok(rows)
    }
}

impl StructureSource for JsonSource {
    fn fetch_structures(&self, query: &StructureQuery) -> Result<StructureStream<'_>> {
        let reader = self.open(STRUCTURES_FILE)?;
        let wanted: FxHashSet<PhaseId> = query.phases.iter().copied().collect();
        debug!(phases = wanted.len(), "streaming structures");

        let records = reader
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|(number, line)| -> Result<StructureRecord> {
                let line = line?;
                serde_json::from_str::<StructureRecord>(&line).map_err(|e| {
                    Error::Source(format!("{STRUCTURES_FILE} line {}: {e}", number + 1))
                })
            })
            .filter(move |record| {
                record
                    .as_ref()
                    .map_or(true, |r| wanted.contains(&r.phase_id))
            });
        Ok(Box::new(records))
    }
}
