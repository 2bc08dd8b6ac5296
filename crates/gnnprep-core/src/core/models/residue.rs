use super::amino_acid::AminoAcid;
use super::ids::{AtomId, ChainId};
use std::collections::HashMap;
use std::fmt;

/// Sequence position of a residue within its chain: number plus optional insertion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueLocus {
    pub number: i32,
    pub insertion_code: Option<char>,
}

impl ResidueLocus {
    pub fn new(number: i32, insertion_code: Option<char>) -> Self {
        Self {
            number,
            insertion_code,
        }
    }
}

impl From<i32> for ResidueLocus {
    fn from(number: i32) -> Self {
        Self::new(number, None)
    }
}

impl fmt::Display for ResidueLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.insertion_code {
            Some(code) => write!(f, "{}{}", self.number, code),
            None => write!(f, "{}", self.number),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub number: i32,                                // Residue sequence number from source file
    pub insertion_code: Option<char>,               // None when the file leaves the column blank
    pub name: String,                               // Residue name as read (e.g., "ALA", "HOH")
    pub amino_acid: Option<&'static AminoAcid>,     // None for non-protein residues
    pub chain_id: ChainId,                          // ID of the parent chain
    pub(crate) atoms: Vec<AtomId>,                  // Atom IDs in file order
    atom_name_map: HashMap<String, AtomId>,         // Atom name to its ID, one atom per name
}

impl Residue {
    pub(crate) fn new(
        locus: ResidueLocus,
        name: &str,
        amino_acid: Option<&'static AminoAcid>,
        chain_id: ChainId,
    ) -> Self {
        Self {
            number: locus.number,
            insertion_code: locus.insertion_code,
            name: name.to_string(),
            amino_acid,
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map.insert(atom_name.to_string(), atom_id);
    }

    /// Swaps the atom registered under `atom_name` for `new_id`, keeping its position in
    /// the atom order. Returns the replaced ID.
    pub(crate) fn replace_atom(&mut self, atom_name: &str, new_id: AtomId) -> Option<AtomId> {
        let entry = self.atom_name_map.get_mut(atom_name)?;
        let old_id = std::mem::replace(entry, new_id);
        if let Some(slot) = self.atoms.iter_mut().find(|id| **id == old_id) {
            *slot = new_id;
        }
        Some(old_id)
    }

    pub fn locus(&self) -> ResidueLocus {
        ResidueLocus::new(self.number, self.insertion_code)
    }

    pub fn is_protein(&self) -> bool {
        self.amino_acid.is_some()
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn get_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).copied()
    }
}
