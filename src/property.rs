//! Property catalogue
//!
//! Each physical property the pipeline can model is identified by a one-letter
//! tag. The catalogue fixes the property name used for retrieval, the unit a
//! measurement must be reported in, and the open interval of plausible values.

use crate::{Error, Result};

/// Semantics of a single modelled property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySemantics {
    /// One-letter tag (e.g. `z` for bulk modulus)
    pub tag: char,
    /// Property name as known to the retrieval service
    pub name: &'static str,
    /// Expected measurement units
    pub units: &'static str,
    /// Open interval of accepted values `(low, high)`
    pub interval: (f64, f64),
    /// Decimal places used when reporting values and errors
    pub rounding: u32,
    /// Skip the near-room-temperature condition filter
    ///
    /// Set for properties that are themselves temperatures.
    pub temperature_exempt: bool,
}

impl PropertySemantics {
    /// Whether `value` lies strictly inside the accepted interval.
    ///
    /// NaN is never accepted.
    #[must_use]
    pub fn accepts(&self, value: f64) -> bool {
        value > self.interval.0 && value < self.interval.1
    }

    /// Format a value in this property's units with its reporting precision.
    #[must_use]
    pub fn format_value(&self, value: f64) -> String {
        format!("{value:.prec$} {}", self.units, prec = self.rounding as usize)
    }
}

/// All known properties.
pub const PROPERTIES: &[PropertySemantics] = &[
    PropertySemantics {
        tag: 'w',
        name: "energy gap for direct transition",
        units: "eV",
        interval: (0.01, 20.0),
        rounding: 1,
        temperature_exempt: false,
    },
    PropertySemantics {
        tag: 'i',
        name: "energy gap for indirect transition",
        units: "eV",
        interval: (0.01, 20.0),
        rounding: 1,
        temperature_exempt: false,
    },
    PropertySemantics {
        tag: 'z',
        name: "isothermal bulk modulus",
        units: "GPa",
        interval: (0.5, 2000.0),
        rounding: 0,
        temperature_exempt: false,
    },
    PropertySemantics {
        tag: 'y',
        name: "enthalpy of formation",
        units: "kJ g-at.-1",
        interval: (-900.0, 200.0),
        rounding: 0,
        temperature_exempt: false,
    },
    PropertySemantics {
        tag: 'x',
        name: "heat capacity at constant pressure",
        units: "J K-1 g-at.-1",
        interval: (0.0, 500.0),
        rounding: 0,
        temperature_exempt: false,
    },
    PropertySemantics {
        tag: 'k',
        name: "Seebeck coefficient",
        units: "muV K-1",
        interval: (-1000.0, 1000.0),
        rounding: 0,
        temperature_exempt: false,
    },
    PropertySemantics {
        tag: 'm',
        name: "temperature for congruent melting",
        units: "K",
        interval: (10.0, 5000.0),
        rounding: 0,
        temperature_exempt: true,
    },
    PropertySemantics {
        tag: 'd',
        name: "Debye temperature",
        units: "K",
        interval: (10.0, 2000.0),
        rounding: 0,
        temperature_exempt: true,
    },
    PropertySemantics {
        tag: 't',
        name: "linear thermal expansion coefficient",
        units: "K-1",
        interval: (-0.001, 0.001),
        rounding: 5,
        temperature_exempt: false,
    },
];

/// Find a property by tag character.
#[must_use]
pub fn find(tag: char) -> Option<&'static PropertySemantics> {
    PROPERTIES.iter().find(|p| p.tag == tag)
}

/// Look up a property from a command-line style tag string.
///
/// # Errors
///
/// Returns [`Error::UnknownProperty`] unless `tag` is exactly one known
/// character.
pub fn lookup(tag: &str) -> Result<&'static PropertySemantics> {
    let mut chars = tag.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => find(c).ok_or_else(|| Error::UnknownProperty(tag.to_string())),
        _ => Err(Error::UnknownProperty(tag.to_string())),
    }
}

/// Comma-separated list of known tags, for user-facing messages.
#[must_use]
pub fn known_tags() -> String {
    PROPERTIES
        .iter()
        .map(|p| p.tag.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
