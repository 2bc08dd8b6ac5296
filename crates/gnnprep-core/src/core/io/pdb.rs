use crate::core::models::builder::{AtomRecord, BuildError, build_structure};
use crate::core::models::structure::Structure;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: &'static str },
    #[error("Line is too short for an ATOM/HETATM record (must reach column 54)")]
    LineTooShort,
}

/// Errors from reading a structure file straight into a [`Structure`].
#[derive(Debug, Error)]
pub enum StructureReadError {
    #[error("Failed to read PDB file: {0}")]
    Pdb(#[from] PdbError),
    #[error("Failed to build structure: {0}")]
    Build(#[from] BuildError),
}

const COORDINATE_END: usize = 54;
const DEFAULT_OCCUPANCY: f64 = 1.0;

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn optional_char(line: &str, column: usize) -> Option<char> {
    line.get(column..column + 1)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
}

fn required<'a>(value: &'a str, line: usize, columns: &'static str) -> Result<&'a str, PdbError> {
    if value.is_empty() {
        Err(PdbError::Parse {
            line,
            kind: PdbParseErrorKind::MissingRequiredField { columns },
        })
    } else {
        Ok(value)
    }
}

fn parse_int<T: FromStr>(value: &str, line: usize, columns: &'static str) -> Result<T, PdbError> {
    required(value, line, columns)?
        .parse()
        .map_err(|_| PdbError::Parse {
            line,
            kind: PdbParseErrorKind::InvalidInt {
                columns,
                value: value.to_string(),
            },
        })
}

fn parse_float(value: &str, line: usize, columns: &'static str) -> Result<f64, PdbError> {
    required(value, line, columns)?
        .parse()
        .map_err(|_| PdbError::Parse {
            line,
            kind: PdbParseErrorKind::InvalidFloat {
                columns,
                value: value.to_string(),
            },
        })
}

/// Serial numbers carry no meaning downstream, so a value that does not parse (hybrid-36
/// serials past 99,999 atoms, blanks) is replaced by the row's position among coordinate rows.
fn parse_serial(value: &str, line_num: usize, row: u32) -> u32 {
    value.parse().unwrap_or_else(|_| {
        debug!(line = line_num, value, fallback = row, "Unreadable atom serial; using row position.");
        row
    })
}

fn parse_atom_line(line: &str, line_num: usize, row: u32) -> Result<AtomRecord, PdbError> {
    if line.len() < COORDINATE_END {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::LineTooShort,
        });
    }

    let serial = parse_serial(slice_and_trim(line, 6, 11), line_num, row);
    let atom_name = required(slice_and_trim(line, 12, 16), line_num, "13-16")?;
    let residue_name = required(slice_and_trim(line, 17, 20), line_num, "18-20")?;
    let residue_number = parse_int(slice_and_trim(line, 22, 26), line_num, "23-26")?;
    let x = parse_float(slice_and_trim(line, 30, 38), line_num, "31-38")?;
    let y = parse_float(slice_and_trim(line, 38, 46), line_num, "39-46")?;
    let z = parse_float(slice_and_trim(line, 46, 54), line_num, "47-54")?;

    let occupancy_str = slice_and_trim(line, 54, 60);
    let occupancy = if occupancy_str.is_empty() {
        DEFAULT_OCCUPANCY
    } else {
        parse_float(occupancy_str, line_num, "55-60")?
    };

    Ok(AtomRecord {
        x,
        y,
        z,
        serial,
        atom_name: atom_name.to_string(),
        altloc: optional_char(line, 16),
        occupancy,
        element: slice_and_trim(line, 76, 78).to_string(),
        chain_id: slice_and_trim(line, 21, 22).to_string(),
        residue_number,
        residue_name: residue_name.to_string(),
        insertion_code: optional_char(line, 26),
    })
}

/// Reader for the fixed-column PDB coordinate format.
pub struct PdbFile;

impl PdbFile {
    /// Reads the `ATOM`/`HETATM` rows of the first model, in file order.
    ///
    /// Reading stops at the first `ENDMDL`; all other record types are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PdbError::Parse`] with the 1-based line number when a coordinate row is
    /// malformed, or [`PdbError::Io`] when the reader fails.
    pub fn read_records(reader: &mut impl BufRead) -> Result<Vec<AtomRecord>, PdbError> {
        let mut records = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" | "HETATM" => {
                    let row = u32::try_from(records.len() + 1).unwrap_or(u32::MAX);
                    records.push(parse_atom_line(&line, line_num, row)?);
                }
                "ENDMDL" => break,
                _ => {}
            }
        }

        Ok(records)
    }

    pub fn read_records_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<AtomRecord>, PdbError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_records(&mut reader)
    }
}

/// Structure identifier derived from a file path: its stem, or the full path if it has none.
pub fn structure_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads a PDB file and builds its [`Structure`], named after the file stem.
pub fn read_structure<P: AsRef<Path>>(path: P) -> Result<Structure, StructureReadError> {
    let path = path.as_ref();
    let records = PdbFile::read_records_from_path(path)?;
    let structure = build_structure(&structure_id_from_path(path), &records)?;
    debug!(
        path = %path.display(),
        rows = records.len(),
        residues = structure.residue_count(),
        "Read structure."
    );
    Ok(structure)
}
