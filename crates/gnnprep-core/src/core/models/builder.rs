use super::amino_acid::AminoAcid;
use super::atom::{Atom, Element};
use super::residue::ResidueLocus;
use super::structure::Structure;
use nalgebra::Point3;
use thiserror::Error;
use tracing::trace;

/// The alternate-location code treated as the primary conformation.
pub const PRIMARY_ALTLOC: char = 'A';

/// One raw atom row, in the shape structure-file readers hand it over.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub serial: u32,
    pub atom_name: String,
    /// Alternate-location indicator; `None` when blank.
    pub altloc: Option<char>,
    pub occupancy: f64,
    /// Element symbol as written in the file; may be empty.
    pub element: String,
    pub chain_id: String,
    pub residue_number: i32,
    pub residue_name: String,
    /// Insertion code; `None` when blank.
    pub insertion_code: Option<char>,
}

impl AtomRecord {
    pub fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    pub fn locus(&self) -> ResidueLocus {
        ResidueLocus::new(self.residue_number, self.insertion_code)
    }

    /// Whether this row belongs to the primary conformation (blank or `A` altloc).
    pub fn is_primary_conformation(&self) -> bool {
        self.altloc.is_none_or(|code| code == PRIMARY_ALTLOC)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("Atom serial {serial}: required field '{field}' is empty")]
    MissingField { serial: u32, field: &'static str },
    #[error("Atom serial {serial}: {field} is not a finite number")]
    NonFinite { serial: u32, field: &'static str },
    #[error("Atom serial {serial}: cannot determine element from '{element}' or atom name '{atom_name}'")]
    UnknownElement {
        serial: u32,
        element: String,
        atom_name: String,
    },
}

/// Incrementally assembles a [`Structure`] from atom rows.
///
/// Rows are consumed in file order. Non-primary alternate locations are skipped, and when
/// two atoms with the same name land in one residue only the higher-occupancy one is kept.
pub struct StructureBuilder {
    structure: Structure,
    skipped_altlocs: usize,
    replaced_atoms: usize,
}

impl StructureBuilder {
    pub fn new(structure_id: &str) -> Self {
        Self {
            structure: Structure::new(structure_id),
            skipped_altlocs: 0,
            replaced_atoms: 0,
        }
    }

    /// Adds one row to the structure under construction.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the row is missing a required field, carries non-finite
    /// numbers, or has no recognizable element.
    pub fn add_record(&mut self, record: &AtomRecord) -> Result<&mut Self, BuildError> {
        validate(record)?;

        if !record.is_primary_conformation() {
            self.skipped_altlocs += 1;
            return Ok(self);
        }

        let element = resolve_element(record)?;
        let amino_acid = AminoAcid::from_three_letter_code(&record.residue_name);

        let chain_id = self.structure.add_chain(&record.chain_id);
        let residue_id = self
            .structure
            .add_residue(chain_id, record.locus(), &record.residue_name, amino_acid)
            .expect("chain was created just above");

        let atom = Atom::new(
            &record.atom_name,
            record.serial,
            element,
            record.position(),
            record.occupancy,
            residue_id,
        );

        let existing = self
            .structure
            .residue(residue_id)
            .and_then(|residue| residue.get_atom_id_by_name(&record.atom_name))
            .and_then(|atom_id| self.structure.atom(atom_id));

        match existing {
            Some(current) if current.occupancy < atom.occupancy => {
                trace!(
                    serial = record.serial,
                    atom = %record.atom_name,
                    "Replacing lower-occupancy duplicate atom."
                );
                self.structure.replace_atom_in_residue(residue_id, atom);
                self.replaced_atoms += 1;
            }
            Some(_) => {
                trace!(
                    serial = record.serial,
                    atom = %record.atom_name,
                    "Dropping duplicate atom with lower or equal occupancy."
                );
            }
            None => {
                self.structure.add_atom_to_residue(residue_id, atom);
            }
        }

        Ok(self)
    }

    pub fn build(self) -> Structure {
        tracing::debug!(
            structure = self.structure.id(),
            chains = self.structure.chain_count(),
            residues = self.structure.residue_count(),
            atoms = self.structure.atom_count(),
            skipped_altlocs = self.skipped_altlocs,
            replaced_atoms = self.replaced_atoms,
            "Structure built."
        );
        self.structure
    }
}

/// Builds a structure from a complete sequence of rows.
///
/// Any malformed row aborts the whole construction; no partial structure is returned.
pub fn build_structure<'a, I>(structure_id: &str, records: I) -> Result<Structure, BuildError>
where
    I: IntoIterator<Item = &'a AtomRecord>,
{
    let mut builder = StructureBuilder::new(structure_id);
    for record in records {
        builder.add_record(record)?;
    }
    Ok(builder.build())
}

fn validate(record: &AtomRecord) -> Result<(), BuildError> {
    let serial = record.serial;
    if record.atom_name.trim().is_empty() {
        return Err(BuildError::MissingField {
            serial,
            field: "atom name",
        });
    }
    if record.residue_name.trim().is_empty() {
        return Err(BuildError::MissingField {
            serial,
            field: "residue name",
        });
    }
    for (value, field) in [(record.x, "x"), (record.y, "y"), (record.z, "z")] {
        if !value.is_finite() {
            return Err(BuildError::NonFinite { serial, field });
        }
    }
    if !record.occupancy.is_finite() {
        return Err(BuildError::NonFinite {
            serial,
            field: "occupancy",
        });
    }
    Ok(())
}

fn resolve_element(record: &AtomRecord) -> Result<Element, BuildError> {
    let parsed = if record.element.trim().is_empty() {
        Element::infer_from_atom_name(&record.atom_name)
    } else {
        record.element.parse().ok()
    };
    parsed.ok_or_else(|| BuildError::UnknownElement {
        serial: record.serial,
        element: record.element.clone(),
        atom_name: record.atom_name.clone(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::models::amino_acid::ALANINE;

    pub(crate) fn record(
        serial: u32,
        atom_name: &str,
        residue_name: &str,
        chain_id: &str,
        residue_number: i32,
        position: [f64; 3],
    ) -> AtomRecord {
        AtomRecord {
            x: position[0],
            y: position[1],
            z: position[2],
            serial,
            atom_name: atom_name.to_string(),
            altloc: None,
            occupancy: 1.0,
            element: String::new(),
            chain_id: chain_id.to_string(),
            residue_number,
            residue_name: residue_name.to_string(),
            insertion_code: None,
        }
    }

    #[test]
    fn groups_rows_into_chains_and_residues() {
        let records = vec![
            record(1, "N", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(2, "CA", "ALA", "A", 1, [1.5, 0.0, 0.0]),
            record(3, "N", "GLY", "A", 2, [3.0, 0.0, 0.0]),
            record(4, "N", "SER", "B", 1, [9.0, 0.0, 0.0]),
        ];
        let structure = build_structure("test", &records).unwrap();

        assert_eq!(structure.id(), "test");
        assert_eq!(structure.chain_count(), 2);
        assert_eq!(structure.residue_count(), 3);
        assert_eq!(structure.atom_count(), 4);

        let chain_a = structure.find_chain_by_id("A").unwrap();
        let ala = structure.find_residue(chain_a, ResidueLocus::from(1)).unwrap();
        let residue = structure.residue(ala).unwrap();
        assert_eq!(residue.amino_acid, Some(&ALANINE));
        assert_eq!(residue.atoms().len(), 2);
    }

    #[test]
    fn revisiting_a_residue_reuses_the_existing_entry() {
        let records = vec![
            record(1, "N", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(2, "N", "GLY", "A", 2, [3.0, 0.0, 0.0]),
            record(3, "CA", "ALA", "A", 1, [1.5, 0.0, 0.0]),
        ];
        let structure = build_structure("test", &records).unwrap();
        assert_eq!(structure.residue_count(), 2);
        let chain_a = structure.find_chain_by_id("A").unwrap();
        let ala = structure.find_residue(chain_a, ResidueLocus::from(1)).unwrap();
        assert_eq!(structure.residue(ala).unwrap().atoms().len(), 2);
    }

    #[test]
    fn non_primary_altlocs_are_skipped() {
        let mut primary = record(1, "CB", "SER", "A", 1, [0.0, 0.0, 0.0]);
        primary.altloc = Some('A');
        let mut alternate = record(2, "CB", "SER", "A", 1, [5.0, 0.0, 0.0]);
        alternate.altloc = Some('B');
        alternate.occupancy = 0.9;

        let structure = build_structure("test", &[primary, alternate]).unwrap();

        assert_eq!(structure.atom_count(), 1);
        let (_, atom) = structure.atoms_iter().next().unwrap();
        assert_eq!(atom.position.x, 0.0);
    }

    #[test]
    fn duplicate_atom_with_higher_occupancy_replaces_existing() {
        let mut low = record(1, "OG", "SER", "A", 1, [0.0, 0.0, 0.0]);
        low.occupancy = 0.3;
        let mut high = record(2, "OG", "SER", "A", 1, [2.0, 0.0, 0.0]);
        high.occupancy = 0.7;

        let structure = build_structure("test", &[low, high]).unwrap();

        assert_eq!(structure.atom_count(), 1);
        let (_, atom) = structure.atoms_iter().next().unwrap();
        assert_eq!(atom.serial, 2);
        assert_eq!(atom.occupancy, 0.7);
        assert_eq!(atom.position.x, 2.0);
    }

    #[test]
    fn duplicate_atom_with_lower_occupancy_is_dropped() {
        let mut high = record(1, "OG", "SER", "A", 1, [0.0, 0.0, 0.0]);
        high.occupancy = 0.6;
        let mut low = record(2, "OG", "SER", "A", 1, [2.0, 0.0, 0.0]);
        low.occupancy = 0.4;

        let structure = build_structure("test", &[high, low]).unwrap();

        let (_, atom) = structure.atoms_iter().next().unwrap();
        assert_eq!(atom.serial, 1);
        assert_eq!(atom.occupancy, 0.6);
    }

    #[test]
    fn insertion_codes_create_distinct_residues() {
        let plain = record(1, "CA", "ALA", "A", 52, [0.0, 0.0, 0.0]);
        let mut inserted = record(2, "CA", "GLY", "A", 52, [3.8, 0.0, 0.0]);
        inserted.insertion_code = Some('A');

        let structure = build_structure("test", &[plain, inserted]).unwrap();

        assert_eq!(structure.residue_count(), 2);
        let chain_a = structure.find_chain_by_id("A").unwrap();
        let found = structure
            .find_residue(chain_a, ResidueLocus::new(52, Some('A')))
            .unwrap();
        assert_eq!(structure.residue(found).unwrap().name, "GLY");
        assert_eq!(
            structure
                .residue(structure.find_residue(chain_a, ResidueLocus::new(52, None)).unwrap())
                .unwrap()
                .insertion_code,
            None
        );
    }

    #[test]
    fn unknown_residue_names_are_non_protein() {
        let structure = build_structure("test", &[record(1, "O", "HOH", "W", 301, [0.0; 3])]).unwrap();
        let (_, residue) = structure.residues_iter().next().unwrap();
        assert!(residue.amino_acid.is_none());
        assert_eq!(residue.name, "HOH");
    }

    #[test]
    fn explicit_element_column_wins_over_inference() {
        let mut zinc = record(1, "ZN", "ZN", "A", 400, [0.0; 3]);
        zinc.element = "ZN".to_string();
        let structure = build_structure("test", &[zinc]).unwrap();
        let (_, atom) = structure.atoms_iter().next().unwrap();
        assert_eq!(atom.element, Element::Zinc);
    }

    #[test]
    fn malformed_row_fails_the_whole_build() {
        let good = record(1, "N", "ALA", "A", 1, [0.0; 3]);
        let bad = record(2, "", "ALA", "A", 1, [0.0; 3]);
        let result = build_structure("test", &[good, bad]);
        assert_eq!(
            result.unwrap_err(),
            BuildError::MissingField {
                serial: 2,
                field: "atom name"
            }
        );
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let bad = record(7, "N", "ALA", "A", 1, [f64::NAN, 0.0, 0.0]);
        assert_eq!(
            build_structure("test", &[bad]).unwrap_err(),
            BuildError::NonFinite {
                serial: 7,
                field: "x"
            }
        );
    }

    #[test]
    fn unknown_element_is_rejected() {
        let mut bad = record(3, "XX", "UNK", "A", 1, [0.0; 3]);
        bad.element = "QQ".to_string();
        assert!(matches!(
            build_structure("test", &[bad]),
            Err(BuildError::UnknownElement { serial: 3, .. })
        ));
    }
}
