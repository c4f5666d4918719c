//! Descriptor aggregation
//!
//! Structure records arrive in arbitrary order and the same phase may be
//! observed several times. Each accepted descriptor is folded into a
//! [`DescriptorAccumulator`]:
//!
//! - a new phase stores its descriptor verbatim
//! - a repeated phase truncates both vectors to the shorter length and keeps
//!   their element-wise mean
//! - the running `max_descriptor_len` only ever decreases, to the shortest
//!   accepted length
//!
//! [`DescriptorAccumulator::finish`] truncates every stored vector to
//! `max_descriptor_len`, so the resulting [`PhaseDescriptorMap`] has one
//! uniform width.

use crate::crystal::{CrystalCompiler, StructureRecord};
use crate::descriptor::DescriptorFn;
use crate::{PhaseId, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Shortest descriptor accepted (after the overreach retry)
pub const MIN_DESCRIPTOR_LEN: usize = 200;

/// Starting value of the running descriptor length bound
pub const INITIAL_MAX_DESCRIPTOR_LEN: usize = MIN_DESCRIPTOR_LEN * 10;

/// Counters collected while aggregating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Records consumed
    pub records: usize,
    /// Records whose structure failed to compile
    pub uncompiled: usize,
    /// Records that needed the overreach retry
    pub overreached: usize,
    /// Records discarded because the descriptor stayed too short
    pub discarded: usize,
    /// Accepted descriptors
    pub accepted: usize,
    /// Accepted descriptors merged into an existing phase
    pub merged: usize,
}

/// Incremental phase → descriptor accumulator.
#[derive(Debug, Clone)]
pub struct DescriptorAccumulator {
    descriptors: FxHashMap<PhaseId, Vec<f64>>,
    max_descriptor_len: usize,
}

impl Default for DescriptorAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptors: FxHashMap::default(),
            max_descriptor_len: INITIAL_MAX_DESCRIPTOR_LEN,
        }
    }

    /// Current uniform length bound.
    #[must_use]
    pub const fn max_descriptor_len(&self) -> usize {
        self.max_descriptor_len
    }

    /// Number of phases seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether no descriptor has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Stored (not yet truncated) descriptor of a phase.
    #[must_use]
    pub fn get(&self, phase_id: PhaseId) -> Option<&[f64]> {
        self.descriptors.get(&phase_id).map(Vec::as_slice)
    }

    /// Fold an accepted descriptor into the accumulator.
    ///
    /// Returns `true` when the phase was already present and the descriptor was
    /// merged into it.
    pub fn observe(&mut self, phase_id: PhaseId, mut descriptor: Vec<f64>) -> bool {
        self.max_descriptor_len = self.max_descriptor_len.min(descriptor.len());

        if let Some(existing) = self.descriptors.get_mut(&phase_id) {
            let len = existing.len().min(descriptor.len());
            existing.truncate(len);
            descriptor.truncate(len);
            for (stored, new) in existing.iter_mut().zip(&descriptor) {
                *stored = (*stored + new) / 2.0;
            }
            true
        } else {
            self.descriptors.insert(phase_id, descriptor);
            false
        }
    }

    /// Truncate every descriptor to the common length and freeze the map.
    #[must_use]
    pub fn finish(self) -> PhaseDescriptorMap {
        let descriptor_len = self.max_descriptor_len;
        let descriptors = self
            .descriptors
            .into_iter()
            .map(|(phase_id, mut descriptor)| {
                descriptor.truncate(descriptor_len);
                (phase_id, descriptor)
            })
            .collect();
        PhaseDescriptorMap {
            descriptors,
            descriptor_len,
        }
    }
}

/// Frozen phase → descriptor map with uniform descriptor length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseDescriptorMap {
    descriptors: BTreeMap<PhaseId, Vec<f64>>,
    descriptor_len: usize,
}

impl PhaseDescriptorMap {
    /// Length shared by every descriptor in the map.
    #[must_use]
    pub const fn descriptor_len(&self) -> usize {
        self.descriptor_len
    }

    /// Descriptor of a phase.
    #[must_use]
    pub fn get(&self, phase_id: PhaseId) -> Option<&[f64]> {
        self.descriptors.get(&phase_id).map(Vec::as_slice)
    }

    /// Number of phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterate in ascending phase order.
    pub fn iter(&self) -> impl Iterator<Item = (PhaseId, &[f64])> {
        self.descriptors.iter().map(|(&id, d)| (id, d.as_slice()))
    }
}

/// Compute a descriptor, retrying with overreach when it is too short.
fn usable_descriptor<D: DescriptorFn + ?Sized>(
    descriptor_fn: &D,
    crystal: &crate::crystal::Crystal,
    kappa: u32,
    stats: &mut AggregationStats,
) -> Option<Vec<f64>> {
    let descriptor = descriptor_fn.descriptor(crystal, kappa, false);
    if descriptor.len() >= MIN_DESCRIPTOR_LEN {
        return Some(descriptor);
    }

    stats.overreached += 1;
    let descriptor = descriptor_fn.descriptor(crystal, kappa, true);
    if descriptor.len() >= MIN_DESCRIPTOR_LEN {
        Some(descriptor)
    } else {
        stats.discarded += 1;
        None
    }
}

/// Aggregate a stream of structure records into a [`PhaseDescriptorMap`].
///
/// Records that do not compile, or whose descriptor stays shorter than
/// [`MIN_DESCRIPTOR_LEN`] after the overreach retry, are skipped.
///
/// # Errors
///
/// Propagates the first error yielded by the record stream.
pub fn aggregate_descriptors<I, C, D>(
    records: I,
    compiler: &C,
    descriptor_fn: &D,
    kappa: u32,
) -> Result<(PhaseDescriptorMap, AggregationStats)>
where
    I: IntoIterator<Item = Result<StructureRecord>>,
    C: CrystalCompiler + ?Sized,
    D: DescriptorFn + ?Sized,
{
    let mut accumulator = DescriptorAccumulator::new();
    let mut stats = AggregationStats::default();

    info!(kappa, "Computing descriptors...");
    for record in records {
        let record = record?;
        stats.records += 1;

        let Some(crystal) = compiler.compile(&record) else {
            stats.uncompiled += 1;
            debug!(phase_id = record.phase_id, entry = %record.entry, "structure did not compile");
            continue;
        };
        let Some(descriptor) = usable_descriptor(descriptor_fn, &crystal, kappa, &mut stats) else {
            debug!(phase_id = record.phase_id, entry = %record.entry, "descriptor too short");
            continue;
        };

        stats.accepted += 1;
        if accumulator.observe(record.phase_id, descriptor) {
            stats.merged += 1;
        }
        if stats.records % 1000 == 0 {
            debug!(records = stats.records, phases = accumulator.len(), "aggregation progress");
        }
    }

    let map = accumulator.finish();
    info!("Current descriptor length: {}", map.descriptor_len());
    debug!(?stats, phases = map.len(), "aggregation done");
    Ok((map, stats))
}
