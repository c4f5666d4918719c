//! Structure descriptors
//!
//! The aggregation stage only relies on the [`DescriptorFn`] contract: a
//! crystal and a `kappa` go in, a vector of floats of data-dependent length
//! comes out, and `overreach` asks for a wider neighbourhood when the first
//! attempt is too short.

use crate::crystal::{norm, Crystal};

/// Descriptor kappa used when none is given
pub const DEFAULT_KAPPA: u32 = 18;

/// Largest kappa accepted by the configuration; the neighbour search grows
/// with the cube of the cut-off radius.
pub const MAX_KAPPA: u32 = 120;

/// Computes a numeric descriptor for a crystal.
pub trait DescriptorFn {
    /// Descriptor of `crystal` at resolution `kappa`.
    ///
    /// With `overreach` set the implementation searches a broader radius.
    fn descriptor(&self, crystal: &Crystal, kappa: u32, overreach: bool) -> Vec<f64>;
}

/// Radial pair descriptor.
///
/// For every atom in the cell, collects `Z_i * Z_j / d_ij` over all periodic
/// neighbours within `kappa / 3` Å (twice that with overreach), sorted in
/// descending order; the per-atom blocks are concatenated in basis order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialDescriptor;

impl RadialDescriptor {
    /// Neighbour cut-off radius in Å.
    #[must_use]
    pub fn cutoff(kappa: u32, overreach: bool) -> f64 {
        let radius = f64::from(kappa) / 3.0;
        if overreach {
            radius * 2.0
        } else {
            radius
        }
    }
}

impl DescriptorFn for RadialDescriptor {
    #[allow(clippy::cast_possible_truncation)]
    fn descriptor(&self, crystal: &Crystal, kappa: u32, overreach: bool) -> Vec<f64> {
        let cutoff = Self::cutoff(kappa, overreach);
        let spacings = crystal.plane_spacings();
        let reach = spacings.map(|s| (cutoff / s).ceil() as i64);

        let cartesian: Vec<[f64; 3]> = crystal
            .positions()
            .iter()
            .map(|&p| crystal.to_cartesian(p))
            .collect();
        let numbers = crystal.numbers();

        let mut descriptor = Vec::new();
        for (i, origin) in cartesian.iter().enumerate() {
            let mut block = Vec::new();
            for n0 in -reach[0]..=reach[0] {
                for n1 in -reach[1]..=reach[1] {
                    for n2 in -reach[2]..=reach[2] {
                        #[allow(clippy::cast_precision_loss)]
                        let shift = crystal.to_cartesian([n0 as f64, n1 as f64, n2 as f64]);
                        for (j, target) in cartesian.iter().enumerate() {
                            let d = norm([
                                target[0] + shift[0] - origin[0],
                                target[1] + shift[1] - origin[1],
                                target[2] + shift[2] - origin[2],
                            ]);
                            if d > 1e-8 && d <= cutoff {
                                block.push(f64::from(numbers[i] * numbers[j]) / d);
                            }
                        }
                    }
                }
            }
            block.sort_by(|a, b| b.total_cmp(a));
            descriptor.extend(block);
        }
        descriptor
    }
}
