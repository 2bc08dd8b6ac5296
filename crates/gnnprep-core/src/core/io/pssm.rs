use crate::core::models::amino_acid::{AMINO_ACID_COUNT, AminoAcid, AminoAcidError};
use crate::core::models::residue::ResidueLocus;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

const LEADING_COLUMNS: [&str; 3] = ["residue_number", "insertion_code", "residue_name"];
const INFORMATION_COLUMN: &str = "information_content";

#[derive(Debug, Error)]
pub enum PssmError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid PSSM header: expected column '{expected}' at position {position}, found '{found}'")]
    Header {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("Invalid value on row {row} in column '{column}': '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Residue {locus} appears more than once")]
    DuplicateResidue { locus: ResidueLocus },
    #[error("Residue {locus} is not present in the PSSM table")]
    MissingResidue { locus: ResidueLocus },
    #[error(transparent)]
    AminoAcid(#[from] AminoAcidError),
}

/// One position of a position-specific scoring matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PssmRow {
    pub residue_name: String,
    /// Scores in amino-acid index order.
    pub scores: [f64; AMINO_ACID_COUNT],
    pub information_content: f64,
}

impl PssmRow {
    pub fn score_for(&self, amino_acid: &AminoAcid) -> Result<f64, AminoAcidError> {
        Ok(self.scores[amino_acid.require_index()?])
    }
}

/// Conservation scores of one chain, keyed by residue position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PssmTable {
    rows: HashMap<ResidueLocus, PssmRow>,
}

impl PssmTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PssmError> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, PssmError> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, PssmError> {
        let headers = reader.headers()?.clone();
        let expected = expected_header()?;
        for (position, expected) in expected.iter().enumerate() {
            let found = headers.get(position).unwrap_or("").trim();
            if found != expected {
                return Err(PssmError::Header {
                    position,
                    expected: expected.clone(),
                    found: found.to_string(),
                });
            }
        }

        let mut rows = HashMap::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let row_num = index + 1;
            let field = |position: usize| record.get(position).unwrap_or("").trim();
            let invalid = |position: usize| PssmError::InvalidValue {
                row: row_num,
                column: expected[position].clone(),
                value: field(position).to_string(),
            };

            let number: i32 = field(0).parse().map_err(|_| invalid(0))?;
            let insertion_code = match field(1) {
                "" => None,
                code => {
                    let mut chars = code.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Some(c),
                        _ => return Err(invalid(1)),
                    }
                }
            };
            let residue_name = field(2);
            if residue_name.is_empty() {
                return Err(invalid(2));
            }

            let mut scores = [0.0; AMINO_ACID_COUNT];
            for (slot, score) in scores.iter_mut().enumerate() {
                let position = LEADING_COLUMNS.len() + slot;
                *score = field(position).parse().map_err(|_| invalid(position))?;
            }
            let info_position = LEADING_COLUMNS.len() + AMINO_ACID_COUNT;
            let information_content: f64 = field(info_position)
                .parse()
                .map_err(|_| invalid(info_position))?;

            let locus = ResidueLocus::new(number, insertion_code);
            let row = PssmRow {
                residue_name: residue_name.to_string(),
                scores,
                information_content,
            };
            if rows.insert(locus, row).is_some() {
                return Err(PssmError::DuplicateResidue { locus });
            }
        }

        Ok(Self { rows })
    }

    pub fn get(&self, locus: ResidueLocus) -> Option<&PssmRow> {
        self.rows.get(&locus)
    }

    pub fn require(&self, locus: ResidueLocus) -> Result<&PssmRow, PssmError> {
        self.get(locus).ok_or(PssmError::MissingResidue { locus })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Header columns in order: the leading residue columns, one column per canonical amino acid
/// (one-letter code, index order) and the information content.
fn expected_header() -> Result<Vec<String>, AminoAcidError> {
    let mut keyed = AminoAcid::canonical()
        .iter()
        .map(|aa| Ok((aa.require_index()?, aa.one_letter_code())))
        .collect::<Result<Vec<_>, AminoAcidError>>()?;
    keyed.sort_by_key(|&(index, _)| index);

    Ok(LEADING_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(keyed.into_iter().map(|(_, code)| code.to_string()))
        .chain(std::iter::once(INFORMATION_COLUMN.to_string()))
        .collect())
}
