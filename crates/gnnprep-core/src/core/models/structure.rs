use super::amino_acid::AminoAcid;
use super::atom::Atom;
use super::chain::Chain;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::{Residue, ResidueLocus};
use slotmap::SlotMap;
use std::collections::HashMap;

/// A complete parsed structure: chains, their residues, and the residues' atoms.
///
/// Components live in typed arenas and refer to their parent through IDs. A `Structure` is
/// populated by the [`StructureBuilder`](super::builder::StructureBuilder) and is read-only
/// afterwards; all mutating methods are crate-private.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    id: String,
    atoms: SlotMap<AtomId, Atom>,
    residues: SlotMap<ResidueId, Residue>,
    chains: SlotMap<ChainId, Chain>,
    /// Chains in order of first appearance.
    chain_order: Vec<ChainId>,
    /// Lookup map for finding chains by their identifier.
    chain_id_map: HashMap<String, ChainId>,
    /// Lookup map for finding residues by chain and sequence position.
    residue_id_map: HashMap<(ChainId, ResidueLocus), ResidueId>,
}

impl Structure {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Chains in file order.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order.iter().map(move |&id| (id, &self.chains[id]))
    }

    /// Residues in file order, chain by chain.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.chains_iter().flat_map(move |(_, chain)| {
            chain
                .residues()
                .iter()
                .map(move |&id| (id, &self.residues[id]))
        })
    }

    /// Atoms in file order, residue by residue.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.residues_iter().flat_map(move |(_, residue)| {
            residue.atoms().iter().map(move |&id| (id, &self.atoms[id]))
        })
    }

    /// Atoms of one residue, in residue order.
    pub fn residue_atoms(&self, residue_id: ResidueId) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.residues
            .get(residue_id)
            .into_iter()
            .flat_map(move |residue| residue.atoms().iter().map(move |&id| (id, &self.atoms[id])))
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn find_chain_by_id(&self, id: &str) -> Option<ChainId> {
        self.chain_id_map.get(id).copied()
    }

    pub fn find_residue(&self, chain_id: ChainId, locus: ResidueLocus) -> Option<ResidueId> {
        self.residue_id_map.get(&(chain_id, locus)).copied()
    }

    /// Finds the first residue of `chain_id` with the given number, regardless of insertion code.
    pub fn find_residue_by_number(&self, chain_id: ChainId, number: i32) -> Option<ResidueId> {
        self.chains.get(chain_id)?.residues().iter().copied().find(|&id| {
            self.residues[id].number == number
        })
    }

    /// Identifier of the chain a residue belongs to.
    pub fn chain_id_of(&self, residue_id: ResidueId) -> Option<&str> {
        let residue = self.residues.get(residue_id)?;
        self.chains.get(residue.chain_id).map(|chain| chain.id.as_str())
    }

    /// Human-readable residue label, `<chain>:<number><icode>:<name>`.
    pub fn residue_label(&self, residue_id: ResidueId) -> String {
        match (self.residue(residue_id), self.chain_id_of(residue_id)) {
            (Some(residue), Some(chain)) => {
                format!("{}:{}:{}", chain, residue.locus(), residue.name)
            }
            _ => "<detached residue>".to_string(),
        }
    }

    /// Human-readable atom label, `<residue label>:<atom name>`.
    pub fn atom_label(&self, atom_id: AtomId) -> String {
        match self.atom(atom_id) {
            Some(atom) => format!("{}:{}", self.residue_label(atom.residue_id), atom.name),
            None => "<detached atom>".to_string(),
        }
    }

    pub(crate) fn add_chain(&mut self, id: &str) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id));
        self.chain_id_map.insert(id.to_string(), chain_id);
        self.chain_order.push(chain_id);
        chain_id
    }

    pub(crate) fn add_residue(
        &mut self,
        chain_id: ChainId,
        locus: ResidueLocus,
        name: &str,
        amino_acid: Option<&'static AminoAcid>,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, locus);

        if let Some(&existing) = self.residue_id_map.get(&key) {
            return Some(existing);
        }

        let residue_id = self
            .residues
            .insert(Residue::new(locus, name, amino_acid, chain_id));
        self.residue_id_map.insert(key, residue_id);
        chain.residues.push(residue_id);
        Some(residue_id)
    }

    pub(crate) fn add_atom_to_residue(&mut self, residue_id: ResidueId, atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.residues[residue_id].add_atom(&name, atom_id);
        Some(atom_id)
    }

    /// Replaces the residue's atom of the same name with `atom`, dropping the old one.
    pub(crate) fn replace_atom_in_residue(
        &mut self,
        residue_id: ResidueId,
        atom: Atom,
    ) -> Option<AtomId> {
        let name = atom.name.clone();
        let residue = self.residues.get(residue_id)?;
        residue.get_atom_id_by_name(&name)?;

        let new_id = self.atoms.insert(atom);
        let old_id = self.residues[residue_id].replace_atom(&name, new_id)?;
        self.atoms.remove(old_id);
        Some(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::amino_acid::{ALANINE, GLYCINE};
    use crate::core::models::atom::Element;
    use nalgebra::Point3;

    fn atom(name: &str, residue_id: ResidueId, x: f64, occupancy: f64) -> Atom {
        Atom::new(name, 1, Element::Carbon, Point3::new(x, 0.0, 0.0), occupancy, residue_id)
    }

    #[test]
    fn add_chain_and_residue_are_idempotent() {
        let mut structure = Structure::new("1ABC");
        let chain_a = structure.add_chain("A");
        assert_eq!(structure.add_chain("A"), chain_a);

        let gly = structure
            .add_residue(chain_a, ResidueLocus::from(1), "GLY", Some(&GLYCINE))
            .unwrap();
        let again = structure
            .add_residue(chain_a, ResidueLocus::from(1), "GLY", Some(&GLYCINE))
            .unwrap();
        assert_eq!(gly, again);
        assert_eq!(structure.residue_count(), 1);
        assert_eq!(structure.chain(chain_a).unwrap().residues(), &[gly]);
    }

    #[test]
    fn insertion_code_distinguishes_residues() {
        let mut structure = Structure::new("1ABC");
        let chain_a = structure.add_chain("A");
        let plain = structure
            .add_residue(chain_a, ResidueLocus::new(52, None), "ALA", Some(&ALANINE))
            .unwrap();
        let inserted = structure
            .add_residue(chain_a, ResidueLocus::new(52, Some('A')), "GLY", Some(&GLYCINE))
            .unwrap();
        assert_ne!(plain, inserted);
        assert_eq!(structure.find_residue(chain_a, ResidueLocus::new(52, Some('A'))), Some(inserted));
        assert_eq!(structure.find_residue_by_number(chain_a, 52), Some(plain));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut structure = Structure::new("1ABC");
        let chain_b = structure.add_chain("B");
        let chain_a = structure.add_chain("A");
        let r1 = structure.add_residue(chain_b, ResidueLocus::from(5), "ALA", Some(&ALANINE)).unwrap();
        let r2 = structure.add_residue(chain_a, ResidueLocus::from(1), "GLY", Some(&GLYCINE)).unwrap();
        structure.add_atom_to_residue(r1, atom("CA", r1, 0.0, 1.0)).unwrap();
        structure.add_atom_to_residue(r2, atom("CA", r2, 1.0, 1.0)).unwrap();

        let chain_ids: Vec<&str> = structure.chains_iter().map(|(_, c)| c.id.as_str()).collect();
        assert_eq!(chain_ids, vec!["B", "A"]);
        let residues: Vec<ResidueId> = structure.residues_iter().map(|(id, _)| id).collect();
        assert_eq!(residues, vec![r1, r2]);
        assert_eq!(structure.atoms_iter().count(), 2);
    }

    #[test]
    fn replace_atom_drops_the_old_atom() {
        let mut structure = Structure::new("1ABC");
        let chain_a = structure.add_chain("A");
        let res = structure.add_residue(chain_a, ResidueLocus::from(1), "ALA", Some(&ALANINE)).unwrap();
        let old = structure.add_atom_to_residue(res, atom("CB", res, 0.0, 0.4)).unwrap();

        let new = structure.replace_atom_in_residue(res, atom("CB", res, 2.0, 0.6)).unwrap();

        assert!(structure.atom(old).is_none());
        assert_eq!(structure.atom(new).unwrap().position.x, 2.0);
        assert_eq!(structure.residue(res).unwrap().atoms(), &[new]);
        assert_eq!(structure.atom_count(), 1);
    }

    #[test]
    fn labels_describe_residues_and_atoms() {
        let mut structure = Structure::new("1ABC");
        let chain_a = structure.add_chain("A");
        let res = structure
            .add_residue(chain_a, ResidueLocus::new(7, Some('B')), "ALA", Some(&ALANINE))
            .unwrap();
        let atom_id = structure.add_atom_to_residue(res, atom("CA", res, 0.0, 1.0)).unwrap();
        assert_eq!(structure.residue_label(res), "A:7B:ALA");
        assert_eq!(structure.atom_label(atom_id), "A:7B:ALA:CA");
        assert_eq!(structure.chain_id_of(res), Some("A"));
    }
}
