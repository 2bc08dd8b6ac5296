use super::ids::ResidueId;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical element of an atom.
///
/// Only the elements that routinely occur in protein structure files are listed; anything
/// else is rejected while parsing so that malformed rows do not slip through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Carbon,
    Nitrogen,
    Oxygen,
    Sulfur,
    Phosphorus,
    Hydrogen,
    Selenium,
    Zinc,
    Iron,
    Magnesium,
    Calcium,
    Sodium,
    Potassium,
    Chlorine,
    Manganese,
    Copper,
    Nickel,
    Cobalt,
    Cadmium,
}

impl Element {
    /// Width of [`Element::one_hot`]: C, N, O, S, P, H, then one slot for everything else.
    pub const ONE_HOT_WIDTH: usize = 7;

    pub fn symbol(self) -> &'static str {
        match self {
            Element::Carbon => "C",
            Element::Nitrogen => "N",
            Element::Oxygen => "O",
            Element::Sulfur => "S",
            Element::Phosphorus => "P",
            Element::Hydrogen => "H",
            Element::Selenium => "SE",
            Element::Zinc => "ZN",
            Element::Iron => "FE",
            Element::Magnesium => "MG",
            Element::Calcium => "CA",
            Element::Sodium => "NA",
            Element::Potassium => "K",
            Element::Chlorine => "CL",
            Element::Manganese => "MN",
            Element::Copper => "CU",
            Element::Nickel => "NI",
            Element::Cobalt => "CO",
            Element::Cadmium => "CD",
        }
    }

    pub fn one_hot(self) -> [f64; Self::ONE_HOT_WIDTH] {
        let slot = match self {
            Element::Carbon => 0,
            Element::Nitrogen => 1,
            Element::Oxygen => 2,
            Element::Sulfur => 3,
            Element::Phosphorus => 4,
            Element::Hydrogen => 5,
            _ => 6,
        };
        let mut encoding = [0.0; Self::ONE_HOT_WIDTH];
        encoding[slot] = 1.0;
        encoding
    }

    /// Guesses the element from a PDB atom name when the element column is blank.
    ///
    /// Protein atom names start with their element letter (`CA` is an alpha carbon, not
    /// calcium), so only the first alphabetic character is considered.
    pub fn infer_from_atom_name(atom_name: &str) -> Option<Self> {
        atom_name
            .trim()
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .and_then(|c| c.to_string().parse().ok())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown element symbol: '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" => Ok(Element::Carbon),
            "N" => Ok(Element::Nitrogen),
            "O" => Ok(Element::Oxygen),
            "S" => Ok(Element::Sulfur),
            "P" => Ok(Element::Phosphorus),
            "H" | "D" => Ok(Element::Hydrogen),
            "SE" => Ok(Element::Selenium),
            "ZN" => Ok(Element::Zinc),
            "FE" => Ok(Element::Iron),
            "MG" => Ok(Element::Magnesium),
            "CA" => Ok(Element::Calcium),
            "NA" => Ok(Element::Sodium),
            "K" => Ok(Element::Potassium),
            "CL" => Ok(Element::Chlorine),
            "MN" => Ok(Element::Manganese),
            "CU" => Ok(Element::Copper),
            "NI" => Ok(Element::Nickel),
            "CO" => Ok(Element::Cobalt),
            "CD" => Ok(Element::Cadmium),
            _ => Err(ParseElementError(s.to_string())),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An atom of a [`Structure`](super::structure::Structure).
///
/// Every atom is owned by exactly one residue, referenced through `residue_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The atom name (e.g., "CA", "N", "OG1").
    pub name: String,
    /// Serial number from the source file.
    pub serial: u32,
    pub element: Element,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Fractional occupancy; decides which alternate location survives.
    pub occupancy: f64,
    /// The ID of the parent residue.
    pub residue_id: ResidueId,
}

impl Atom {
    pub fn new(
        name: &str,
        serial: u32,
        element: Element,
        position: Point3<f64>,
        occupancy: f64,
        residue_id: ResidueId,
    ) -> Self {
        Self {
            name: name.to_string(),
            serial,
            element,
            position,
            occupancy,
            residue_id,
        }
    }

    pub fn distance_to(&self, other: &Atom) -> f64 {
        nalgebra::distance(&self.position, &other.position)
    }
}
