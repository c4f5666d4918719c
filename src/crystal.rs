//! Structure records and crystal compilation
//!
//! A [`StructureRecord`] is the raw geometry delivered by the structure
//! retrieval collaborator. A [`CrystalCompiler`] turns it into a [`Crystal`]
//! (lattice + fractional positions + atomic numbers) or gives up, in which case
//! the record simply carries no usable structure.

use crate::PhaseId;
use serde::{Deserialize, Serialize};

/// Raw crystal structure entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    /// Phase this structure belongs to
    pub phase_id: PhaseId,
    /// Entry identifier in the source database
    #[serde(default)]
    pub entry: String,
    /// Chemical formula
    #[serde(default)]
    pub chemical_formula: String,
    /// Cell parameters `a, b, c` (Å) and `alpha, beta, gamma` (degrees)
    #[serde(default)]
    pub cell_abc: Vec<f64>,
    /// Space group number
    #[serde(default)]
    pub sg_n: u32,
    /// Space group setting
    #[serde(default)]
    pub setting: Option<String>,
    /// Fractional coordinates of the symmetry non-equivalent atoms
    #[serde(default)]
    pub basis_noneq: Vec<[f64; 3]>,
    /// Element symbols matching `basis_noneq`
    #[serde(default)]
    pub els_noneq: Vec<String>,
}

/// Compiled periodic structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    lattice: [[f64; 3]; 3],
    positions: Vec<[f64; 3]>,
    numbers: Vec<u32>,
}

impl Crystal {
    /// Build a crystal from lattice row vectors, fractional positions and
    /// atomic numbers.
    ///
    /// Returns `None` when the positions and numbers disagree in length, the
    /// basis is empty, or the lattice has no volume.
    #[must_use]
    pub fn new(lattice: [[f64; 3]; 3], positions: Vec<[f64; 3]>, numbers: Vec<u32>) -> Option<Self> {
        if positions.is_empty() || positions.len() != numbers.len() {
            return None;
        }
        let crystal = Self {
            lattice,
            positions,
            numbers,
        };
        let volume = crystal.volume();
        (volume.is_finite() && volume > 1e-6).then_some(crystal)
    }

    /// Lattice row vectors (Å).
    #[must_use]
    pub const fn lattice(&self) -> &[[f64; 3]; 3] {
        &self.lattice
    }

    /// Fractional positions.
    #[must_use]
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Atomic numbers.
    #[must_use]
    pub fn numbers(&self) -> &[u32] {
        &self.numbers
    }

    /// Number of atoms in the cell.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the cell holds no atoms (never true for a compiled crystal).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Cell volume (Å³).
    #[must_use]
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.lattice;
        dot(a, cross(b, c)).abs()
    }

    /// Cartesian coordinates of a fractional position.
    #[must_use]
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let [a, b, c] = self.lattice;
        [
            frac[0] * a[0] + frac[1] * b[0] + frac[2] * c[0],
            frac[0] * a[1] + frac[1] * b[1] + frac[2] * c[1],
            frac[0] * a[2] + frac[1] * b[2] + frac[2] * c[2],
        ]
    }

    /// Spacing between lattice planes spanned by the two other vectors, per axis.
    #[must_use]
    pub fn plane_spacings(&self) -> [f64; 3] {
        let [a, b, c] = self.lattice;
        let volume = self.volume();
        [
            volume / norm(cross(b, c)),
            volume / norm(cross(c, a)),
            volume / norm(cross(a, b)),
        ]
    }
}

pub(crate) fn dot(u: [f64; 3], v: [f64; 3]) -> f64 {
    u[0] * v[0] + u[1] * v[1] + u[2] * v[2]
}

pub(crate) fn cross(u: [f64; 3], v: [f64; 3]) -> [f64; 3] {
    [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ]
}

pub(crate) fn norm(u: [f64; 3]) -> f64 {
    dot(u, u).sqrt()
}

/// Compiles raw structure records into crystals.
pub trait CrystalCompiler {
    /// Compile `record`, or return `None` if it carries no usable structure.
    fn compile(&self, record: &StructureRecord) -> Option<Crystal>;
}

/// Builds a P1 cell from the cell parameters and the non-equivalent basis.
///
/// Symmetry-equivalent positions are not generated.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellCompiler;

impl CrystalCompiler for CellCompiler {
    fn compile(&self, record: &StructureRecord) -> Option<Crystal> {
        let lattice = lattice_from_parameters(&record.cell_abc)?;
        if record.basis_noneq.len() != record.els_noneq.len() {
            return None;
        }
        let numbers = record
            .els_noneq
            .iter()
            .map(|el| atomic_number(el))
            .collect::<Option<Vec<u32>>>()?;
        let positions = record
            .basis_noneq
            .iter()
            .map(|p| p.map(|x| x.rem_euclid(1.0)))
            .collect();
        Crystal::new(lattice, positions, numbers)
    }
}

/// Lattice row vectors from `a, b, c, alpha, beta, gamma`.
///
/// `a` lies along x and `b` in the xy plane.
#[must_use]
pub fn lattice_from_parameters(params: &[f64]) -> Option<[[f64; 3]; 3]> {
    let &[a, b, c, alpha, beta, gamma] = params else {
        return None;
    };
    if [a, b, c].iter().any(|&l| !l.is_finite() || l <= 0.0) {
        return None;
    }
    let (cos_a, cos_b) = (alpha.to_radians().cos(), beta.to_radians().cos());
    let (cos_g, sin_g) = (gamma.to_radians().cos(), gamma.to_radians().sin());
    if sin_g.abs() < 1e-8 {
        return None;
    }

    let cx = c * cos_b;
    let cy = c * (cos_a - cos_b * cos_g) / sin_g;
    let cz_sq = c * c - cx * cx - cy * cy;
    if !(cz_sq > 1e-12) {
        return None;
    }

    Some([
        [a, 0.0, 0.0],
        [b * cos_g, b * sin_g, 0.0],
        [cx, cy, cz_sq.sqrt()],
    ])
}

const ELEMENTS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Atomic number of an element symbol (case-sensitive, e.g. `"Fe"`).
#[must_use]
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|&el| el == symbol.trim())
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rocksalt(phase_id: PhaseId) -> StructureRecord {
        StructureRecord {
            phase_id,
            entry: "S1".to_string(),
            chemical_formula: "NaCl".to_string(),
            cell_abc: vec![5.64, 5.64, 5.64, 90.0, 90.0, 90.0],
            sg_n: 225,
            setting: None,
            basis_noneq: vec![[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]],
            els_noneq: vec!["Na".to_string(), "Cl".to_string()],
        }
    }

    #[test]
    fn test_compile_cubic_cell() {
        let crystal = CellCompiler.compile(&rocksalt(1)).unwrap();
        assert_eq!(crystal.len(), 2);
        assert_eq!(crystal.numbers(), &[11, 17]);
        assert!((crystal.volume() - 5.64f64.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn test_compile_rejects_bad_records() {
        let mut missing_cell = rocksalt(1);
        missing_cell.cell_abc.clear();
        assert!(CellCompiler.compile(&missing_cell).is_none());

        let mut unknown_element = rocksalt(1);
        unknown_element.els_noneq[0] = "Xx".to_string();
        assert!(CellCompiler.compile(&unknown_element).is_none());

        let mut ragged = rocksalt(1);
        ragged.els_noneq.pop();
        assert!(CellCompiler.compile(&ragged).is_none());

        let mut flat = rocksalt(1);
        flat.cell_abc = vec![3.0, 3.0, 3.0, 90.0, 90.0, 0.0];
        assert!(CellCompiler.compile(&flat).is_none());
    }

    #[test]
    fn test_hexagonal_lattice_volume() {
        let lattice = lattice_from_parameters(&[3.0, 3.0, 5.0, 90.0, 90.0, 120.0]).unwrap();
        let crystal = Crystal::new(lattice, vec![[0.0; 3]], vec![6]).unwrap();
        let expected = 3.0 * 3.0 * 5.0 * (120f64.to_radians()).sin();
        assert!((crystal.volume() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_plane_spacings_orthorhombic() {
        let lattice = lattice_from_parameters(&[2.0, 3.0, 4.0, 90.0, 90.0, 90.0]).unwrap();
        let crystal = Crystal::new(lattice, vec![[0.0; 3]], vec![1]).unwrap();
        let spacings = crystal.plane_spacings();
        assert!((spacings[0] - 2.0).abs() < 1e-9);
        assert!((spacings[1] - 3.0).abs() < 1e-9);
        assert!((spacings[2] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_atomic_numbers() {
        assert_eq!(atomic_number("H"), Some(1));
        assert_eq!(atomic_number("Og"), Some(118));
        assert_eq!(atomic_number("fe"), None);
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let json = r#"{"phase_id": 9, "cell_abc": [1, 1, 1, 90, 90, 90]}"#;
        let record: StructureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.phase_id, 9);
        assert!(record.basis_noneq.is_empty());
        assert!(CellCompiler.compile(&record).is_none());
    }
}
