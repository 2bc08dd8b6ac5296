use phf::{Map, phf_map};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Number of canonical amino acids, and the width of a residue-type one-hot encoding.
pub const AMINO_ACID_COUNT: usize = 20;

/// Side-chain polarity class of an amino acid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Polarity {
    Nonpolar,
    Polar,
    Negative,
    Positive,
}

impl Polarity {
    pub const COUNT: usize = 4;

    pub const ALL: [Polarity; Self::COUNT] = [
        Polarity::Nonpolar,
        Polarity::Polar,
        Polarity::Negative,
        Polarity::Positive,
    ];

    pub fn index(self) -> usize {
        match self {
            Polarity::Nonpolar => 0,
            Polarity::Polar => 1,
            Polarity::Negative => 2,
            Polarity::Positive => 3,
        }
    }

    pub fn one_hot(self) -> [f64; Self::COUNT] {
        let mut encoding = [0.0; Self::COUNT];
        encoding[self.index()] = 1.0;
        encoding
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Polarity::Nonpolar => "NONPOLAR",
            Polarity::Polar => "POLAR",
            Polarity::Negative => "NEGATIVE",
            Polarity::Positive => "POSITIVE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AminoAcidError {
    #[error("Amino acid '{0}' has no index set, so no one-hot encoding can be computed")]
    IndexUnset(&'static str),
    #[error("Unknown amino acid code: '{0}'")]
    UnknownCode(String),
}

/// Reference data for one amino acid type.
///
/// Instances are immutable and normally taken from the static table via
/// [`AminoAcid::from_three_letter_code`]. Equality and hashing only consider the name.
#[derive(Debug, Clone, Copy)]
pub struct AminoAcid {
    name: &'static str,
    three_letter_code: &'static str,
    one_letter_code: char,
    charge: i8,
    polarity: Polarity,
    size: u8,
    mass: f64,
    isoelectric_point: f64,
    hydrogen_bond_donors: u8,
    hydrogen_bond_acceptors: u8,
    index: Option<u8>,
}

impl AminoAcid {
    /// Creates an amino acid definition.
    ///
    /// `size` is the number of side-chain heavy atoms, `mass` the average residue mass in
    /// Daltons, and `index` the rank used for one-hot encoding (`None` for types outside the
    /// canonical twenty).
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        name: &'static str,
        three_letter_code: &'static str,
        one_letter_code: char,
        charge: i8,
        polarity: Polarity,
        size: u8,
        mass: f64,
        isoelectric_point: f64,
        hydrogen_bond_donors: u8,
        hydrogen_bond_acceptors: u8,
        index: Option<u8>,
    ) -> Self {
        Self {
            name,
            three_letter_code,
            one_letter_code,
            charge,
            polarity,
            size,
            mass,
            isoelectric_point,
            hydrogen_bond_donors,
            hydrogen_bond_acceptors,
            index,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn three_letter_code(&self) -> &'static str {
        self.three_letter_code
    }

    pub fn one_letter_code(&self) -> char {
        self.one_letter_code
    }

    pub fn charge(&self) -> i8 {
        self.charge
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn isoelectric_point(&self) -> f64 {
        self.isoelectric_point
    }

    pub fn hydrogen_bond_donors(&self) -> u8 {
        self.hydrogen_bond_donors
    }

    pub fn hydrogen_bond_acceptors(&self) -> u8 {
        self.hydrogen_bond_acceptors
    }

    pub fn index(&self) -> Option<usize> {
        self.index.map(usize::from)
    }

    /// Returns the index, failing for amino acids outside the canonical table.
    pub fn require_index(&self) -> Result<usize, AminoAcidError> {
        self.index().ok_or(AminoAcidError::IndexUnset(self.name))
    }

    /// One-hot encoding over the twenty canonical amino acids.
    ///
    /// # Errors
    ///
    /// Returns [`AminoAcidError::IndexUnset`] if this amino acid carries no index.
    pub fn one_hot(&self) -> Result<[f64; AMINO_ACID_COUNT], AminoAcidError> {
        let index = self.require_index()?;
        let mut encoding = [0.0; AMINO_ACID_COUNT];
        encoding[index] = 1.0;
        Ok(encoding)
    }

    pub fn from_three_letter_code(code: &str) -> Option<&'static AminoAcid> {
        AMINO_ACIDS_BY_CODE.get(code).copied()
    }

    pub fn from_one_letter_code(code: char) -> Option<&'static AminoAcid> {
        CANONICAL_AMINO_ACIDS
            .iter()
            .copied()
            .find(|aa| aa.one_letter_code == code.to_ascii_uppercase())
    }

    /// All canonical amino acids, ordered by their one-hot index.
    pub fn canonical() -> &'static [&'static AminoAcid; AMINO_ACID_COUNT] {
        &CANONICAL_AMINO_ACIDS
    }
}

impl PartialEq for AminoAcid {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for AminoAcid {}

impl Hash for AminoAcid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.three_letter_code)
    }
}

/// Parses either a three-letter (`"ALA"`) or a one-letter (`"A"`) code, case-insensitively.
impl FromStr for &'static AminoAcid {
    type Err = AminoAcidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let mut chars = upper.chars();
        let found = match (chars.next(), chars.next()) {
            (Some(c), None) => AminoAcid::from_one_letter_code(c),
            _ => AminoAcid::from_three_letter_code(&upper),
        };
        found.ok_or_else(|| AminoAcidError::UnknownCode(s.to_string()))
    }
}

use Polarity::{Negative, Nonpolar, Polar, Positive};

pub static ALANINE: AminoAcid =
    AminoAcid::new("Alanine", "ALA", 'A', 0, Nonpolar, 1, 71.08, 6.00, 0, 0, Some(0));
pub static CYSTEINE: AminoAcid =
    AminoAcid::new("Cysteine", "CYS", 'C', 0, Polar, 2, 103.14, 5.07, 0, 0, Some(1));
pub static ASPARTATE: AminoAcid =
    AminoAcid::new("Aspartate", "ASP", 'D', -1, Negative, 4, 115.09, 2.77, 0, 2, Some(2));
pub static GLUTAMATE: AminoAcid =
    AminoAcid::new("Glutamate", "GLU", 'E', -1, Negative, 5, 129.12, 3.22, 0, 2, Some(3));
pub static PHENYLALANINE: AminoAcid =
    AminoAcid::new("Phenylalanine", "PHE", 'F', 0, Nonpolar, 7, 147.18, 5.48, 0, 0, Some(4));
pub static GLYCINE: AminoAcid =
    AminoAcid::new("Glycine", "GLY", 'G', 0, Nonpolar, 0, 57.05, 5.97, 0, 0, Some(5));
pub static HISTIDINE: AminoAcid =
    AminoAcid::new("Histidine", "HIS", 'H', 1, Positive, 6, 137.14, 7.59, 1, 1, Some(6));
pub static ISOLEUCINE: AminoAcid =
    AminoAcid::new("Isoleucine", "ILE", 'I', 0, Nonpolar, 4, 113.16, 6.02, 0, 0, Some(7));
pub static LYSINE: AminoAcid =
    AminoAcid::new("Lysine", "LYS", 'K', 1, Positive, 5, 128.17, 9.74, 3, 0, Some(8));
pub static LEUCINE: AminoAcid =
    AminoAcid::new("Leucine", "LEU", 'L', 0, Nonpolar, 4, 113.16, 5.98, 0, 0, Some(9));
pub static METHIONINE: AminoAcid =
    AminoAcid::new("Methionine", "MET", 'M', 0, Nonpolar, 4, 131.19, 5.74, 0, 0, Some(10));
pub static ASPARAGINE: AminoAcid =
    AminoAcid::new("Asparagine", "ASN", 'N', 0, Polar, 4, 114.10, 5.41, 2, 2, Some(11));
pub static PROLINE: AminoAcid =
    AminoAcid::new("Proline", "PRO", 'P', 0, Nonpolar, 3, 97.12, 6.30, 0, 0, Some(12));
pub static GLUTAMINE: AminoAcid =
    AminoAcid::new("Glutamine", "GLN", 'Q', 0, Polar, 5, 128.13, 5.65, 2, 2, Some(13));
pub static ARGININE: AminoAcid =
    AminoAcid::new("Arginine", "ARG", 'R', 1, Positive, 7, 156.19, 10.76, 5, 0, Some(14));
pub static SERINE: AminoAcid =
    AminoAcid::new("Serine", "SER", 'S', 0, Polar, 2, 87.08, 5.68, 1, 2, Some(15));
pub static THREONINE: AminoAcid =
    AminoAcid::new("Threonine", "THR", 'T', 0, Polar, 3, 101.10, 5.60, 1, 2, Some(16));
pub static VALINE: AminoAcid =
    AminoAcid::new("Valine", "VAL", 'V', 0, Nonpolar, 3, 99.13, 5.96, 0, 0, Some(17));
pub static TRYPTOPHAN: AminoAcid =
    AminoAcid::new("Tryptophan", "TRP", 'W', 0, Nonpolar, 10, 186.21, 5.89, 1, 0, Some(18));
pub static TYROSINE: AminoAcid =
    AminoAcid::new("Tyrosine", "TYR", 'Y', 0, Polar, 8, 163.18, 5.66, 1, 1, Some(19));

static CANONICAL_AMINO_ACIDS: [&AminoAcid; AMINO_ACID_COUNT] = [
    &ALANINE,
    &CYSTEINE,
    &ASPARTATE,
    &GLUTAMATE,
    &PHENYLALANINE,
    &GLYCINE,
    &HISTIDINE,
    &ISOLEUCINE,
    &LYSINE,
    &LEUCINE,
    &METHIONINE,
    &ASPARAGINE,
    &PROLINE,
    &GLUTAMINE,
    &ARGININE,
    &SERINE,
    &THREONINE,
    &VALINE,
    &TRYPTOPHAN,
    &TYROSINE,
];

static AMINO_ACIDS_BY_CODE: Map<&'static str, &'static AminoAcid> = phf_map! {
    "ALA" => &ALANINE,
    "CYS" => &CYSTEINE,
    "ASP" => &ASPARTATE,
    "GLU" => &GLUTAMATE,
    "PHE" => &PHENYLALANINE,
    "GLY" => &GLYCINE,
    "HIS" => &HISTIDINE,
    "ILE" => &ISOLEUCINE,
    "LYS" => &LYSINE,
    "LEU" => &LEUCINE,
    "MET" => &METHIONINE,
    "ASN" => &ASPARAGINE,
    "PRO" => &PROLINE,
    "GLN" => &GLUTAMINE,
    "ARG" => &ARGININE,
    "SER" => &SERINE,
    "THR" => &THREONINE,
    "VAL" => &VALINE,
    "TRP" => &TRYPTOPHAN,
    "TYR" => &TYROSINE,
};
