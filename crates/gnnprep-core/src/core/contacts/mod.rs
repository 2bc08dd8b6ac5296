//! # Contacts Module
//!
//! Determines which residue or atom pairs of two chains are in physical contact.
//!
//! Residue contacts are discovered by a [`ContactOracle`] working on raw atom rows and then
//! reconciled with the parsed [`Structure`]. Atom contacts are computed directly on the
//! structure. Reconciliation never drops a contact silently: a key that cannot be matched to a
//! residue is an error.

pub mod oracle;

pub use oracle::{ContactMap, ContactOracle, KdTreeContactOracle, OracleResidue};

use crate::core::graph::pair::Pair;
use crate::core::models::ids::{AtomId, ChainId, ResidueId};
use crate::core::models::structure::Structure;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContactError {
    #[error("Contact cutoff must be a positive distance, got {0}")]
    InvalidCutoff(f64),
    #[error("Chain '{0}' is not present in the structure")]
    MissingChain(String),
    #[error("Contact residue {0} could not be matched to a residue of the structure")]
    Unresolved(OracleResidue),
    #[error("Contact oracle failed: {0}")]
    Oracle(String),
}

/// Resolves contacts between two chains of one structure.
pub struct ContactResolver<'a> {
    structure: &'a Structure,
}

impl<'a> ContactResolver<'a> {
    pub fn new(structure: &'a Structure) -> Self {
        Self { structure }
    }

    /// Residue pairs (one from each chain) whose shortest interatomic distance is at most
    /// `cutoff`, as reported by `oracle`.
    ///
    /// # Errors
    ///
    /// Fails when the cutoff is not positive, either chain is absent from the structure, the
    /// oracle fails, or any reported residue cannot be reconciled with the structure.
    pub fn residue_pairs(
        &self,
        oracle: &dyn ContactOracle,
        chain1: &str,
        chain2: &str,
        cutoff: f64,
    ) -> Result<HashSet<Pair<ResidueId>>, ContactError> {
        check_cutoff(cutoff)?;
        self.chain(chain1)?;
        self.chain(chain2)?;

        let raw = oracle.contact_residues(cutoff, chain1, chain2)?;
        let mut pairs = HashSet::new();
        for (key, partners) in &raw {
            let residue = self.resolve(key)?;
            for partner in partners {
                pairs.insert(Pair::new(residue, self.resolve(partner)?));
            }
        }

        debug!(
            structure = self.structure.id(),
            chain1,
            chain2,
            cutoff,
            pairs = pairs.len(),
            "Resolved residue contacts."
        );
        Ok(pairs)
    }

    /// Atom pairs (one from each chain) no further apart than `cutoff`.
    pub fn atom_pairs(
        &self,
        chain1: &str,
        chain2: &str,
        cutoff: f64,
    ) -> Result<HashSet<Pair<AtomId>>, ContactError> {
        check_cutoff(cutoff)?;
        let first = self.chain(chain1)?;
        let second = self.chain(chain2)?;

        let partners: Vec<(AtomId, [f64; 3])> = self
            .chain_atoms(second)
            .filter_map(|aid| {
                let pos = self.structure.atom(aid)?.position;
                Some((aid, [pos.x, pos.y, pos.z]))
            })
            .collect();
        let mut pairs = HashSet::new();
        if partners.is_empty() {
            return Ok(pairs);
        }

        let points: Vec<[f64; 3]> = partners.iter().map(|(_, position)| *position).collect();
        let tree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(&points);

        let cutoff_sq = cutoff * cutoff;
        for atom_id in self.chain_atoms(first) {
            let Some(atom) = self.structure.atom(atom_id) else {
                continue;
            };
            let query = [atom.position.x, atom.position.y, atom.position.z];
            let padded = cutoff_sq * (1.0 + 1e-9) + 1e-12;
            for hit in tree.within::<SquaredEuclidean>(&query, padded) {
                let partner = partners[hit.item as usize].0;
                if hit.distance <= cutoff_sq && partner != atom_id {
                    pairs.insert(Pair::new(atom_id, partner));
                }
            }
        }

        debug!(
            structure = self.structure.id(),
            chain1,
            chain2,
            cutoff,
            pairs = pairs.len(),
            "Resolved atom contacts."
        );
        Ok(pairs)
    }

    /// Matches an oracle key to a residue of the structure.
    ///
    /// The first residue of the chain with the key's number is taken, skipping protein
    /// residues whose name differs from the key's. Non-protein residues match on number only.
    pub fn resolve(&self, key: &OracleResidue) -> Result<ResidueId, ContactError> {
        let chain_id = self.chain(&key.chain_id)?;
        let chain = self
            .structure
            .chain(chain_id)
            .ok_or_else(|| ContactError::MissingChain(key.chain_id.clone()))?;

        chain
            .residues()
            .iter()
            .copied()
            .find(|&rid| {
                self.structure.residue(rid).is_some_and(|residue| {
                    residue.number == key.residue_number
                        && (!residue.is_protein() || residue.name == key.residue_name)
                })
            })
            .ok_or_else(|| ContactError::Unresolved(key.clone()))
    }

    fn chain(&self, id: &str) -> Result<ChainId, ContactError> {
        self.structure
            .find_chain_by_id(id)
            .ok_or_else(|| ContactError::MissingChain(id.to_string()))
    }

    fn chain_atoms(&self, chain_id: ChainId) -> impl Iterator<Item = AtomId> + '_ {
        self.structure
            .chain(chain_id)
            .into_iter()
            .flat_map(|chain| chain.residues().iter())
            .flat_map(move |&rid| self.structure.residue_atoms(rid).map(|(aid, _)| aid))
    }
}

fn check_cutoff(cutoff: f64) -> Result<(), ContactError> {
    if cutoff.is_finite() && cutoff > 0.0 {
        Ok(())
    } else {
        Err(ContactError::InvalidCutoff(cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::tests::record;
    use crate::core::models::builder::{AtomRecord, build_structure};
    use crate::core::models::residue::ResidueLocus;
    use crate::core::utils::geometry::shortest_distance;
    use std::collections::HashMap;

    fn rows() -> Vec<AtomRecord> {
        vec![
            record(1, "N", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(2, "CA", "ALA", "A", 1, [1.5, 0.0, 0.0]),
            record(3, "CA", "GLY", "A", 2, [5.0, 0.0, 0.0]),
            record(4, "CA", "SER", "A", 3, [40.0, 0.0, 0.0]),
            record(5, "CA", "LYS", "B", 1, [1.5, 3.0, 0.0]),
            record(6, "CA", "ASP", "B", 2, [5.0, 4.5, 0.0]),
            record(7, "CA", "GLU", "B", 3, [60.0, 0.0, 0.0]),
        ]
    }

    fn rid(structure: &Structure, chain: &str, number: i32) -> ResidueId {
        let chain_id = structure.find_chain_by_id(chain).unwrap();
        structure.find_residue(chain_id, ResidueLocus::from(number)).unwrap()
    }

    struct FixedOracle(ContactMap);

    impl ContactOracle for FixedOracle {
        fn contact_residues(&self, _: f64, _: &str, _: &str) -> Result<ContactMap, ContactError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn residue_pairs_are_exactly_those_within_cutoff() {
        let rows = rows();
        let structure = build_structure("c", &rows).unwrap();
        let oracle = KdTreeContactOracle::from_records(&rows);
        let resolver = ContactResolver::new(&structure);
        let cutoff = 4.6;

        let pairs = resolver.residue_pairs(&oracle, "A", "B", cutoff).unwrap();

        let chain_a = structure.find_chain_by_id("A").unwrap();
        let chain_b = structure.find_chain_by_id("B").unwrap();
        for &a in structure.chain(chain_a).unwrap().residues() {
            for &b in structure.chain(chain_b).unwrap().residues() {
                let distance = shortest_distance(&structure, a, b).unwrap();
                assert_eq!(pairs.contains(&Pair::new(a, b)), distance <= cutoff);
            }
        }
        assert!(pairs.contains(&Pair::new(rid(&structure, "A", 1), rid(&structure, "B", 1))));
        assert!(pairs.contains(&Pair::new(rid(&structure, "A", 2), rid(&structure, "B", 2))));
    }

    #[test]
    fn residue_pairs_ignore_displaced_lower_occupancy_atoms() {
        let mut near = record(2, "CB", "ASP", "B", 1, [0.0, 3.0, 0.0]);
        near.occupancy = 0.3;
        let mut far = record(3, "CB", "ASP", "B", 1, [0.0, 20.0, 0.0]);
        far.occupancy = 0.7;
        let rows = vec![record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]), near, far];
        let structure = build_structure("c", &rows).unwrap();
        let oracle = KdTreeContactOracle::from_records(&rows);

        let pairs = ContactResolver::new(&structure)
            .residue_pairs(&oracle, "A", "B", 5.0)
            .unwrap();

        assert!(pairs.is_empty());
        let a = rid(&structure, "A", 1);
        let b = rid(&structure, "B", 1);
        assert_eq!(shortest_distance(&structure, a, b), Some(20.0));
    }

    #[test]
    fn atom_pairs_handle_many_atoms_on_one_plane() {
        let mut rows = vec![record(1, "CA", "ALA", "A", 1, [1.0, 0.0, 0.0])];
        for i in 0..200 {
            rows.push(record(
                i + 2,
                "CA",
                "GLY",
                "B",
                i as i32 + 1,
                [1.0, 4.0 * f64::from(i), 1.5],
            ));
        }
        let structure = build_structure("plane", &rows).unwrap();
        let resolver = ContactResolver::new(&structure);

        assert_eq!(resolver.atom_pairs("A", "B", 5.0).unwrap().len(), 2);
        let oracle = KdTreeContactOracle::from_records(&rows);
        assert_eq!(resolver.residue_pairs(&oracle, "A", "B", 5.0).unwrap().len(), 2);
    }

    #[test]
    fn unresolvable_key_is_an_error() {
        let structure = build_structure("c", &rows()).unwrap();
        let mut map = HashMap::new();
        map.insert(
            OracleResidue::new("A", 1, "ALA"),
            vec![OracleResidue::new("B", 99, "LYS")],
        );
        let result = ContactResolver::new(&structure).residue_pairs(&FixedOracle(map), "A", "B", 5.0);
        assert_eq!(
            result,
            Err(ContactError::Unresolved(OracleResidue::new("B", 99, "LYS")))
        );
    }

    #[test]
    fn protein_residue_name_mismatch_is_unresolved() {
        let structure = build_structure("c", &rows()).unwrap();
        let resolver = ContactResolver::new(&structure);
        assert!(matches!(
            resolver.resolve(&OracleResidue::new("A", 1, "GLY")),
            Err(ContactError::Unresolved(_))
        ));
    }

    #[test]
    fn non_protein_residue_matches_on_number_only() {
        let mut rows = rows();
        rows.push(record(8, "O", "HOH", "B", 301, [0.0, 0.0, 9.0]));
        let structure = build_structure("c", &rows).unwrap();
        let resolver = ContactResolver::new(&structure);
        assert_eq!(
            resolver.resolve(&OracleResidue::new("B", 301, "WAT")),
            Ok(rid(&structure, "B", 301))
        );
    }

    #[test]
    fn insertion_code_variants_resolve_to_first_in_chain_order() {
        let mut rows = rows();
        let mut inserted = record(9, "CA", "ALA", "A", 1, [0.0, 9.0, 9.0]);
        inserted.insertion_code = Some('A');
        rows.insert(2, inserted);
        let structure = build_structure("c", &rows).unwrap();
        let resolver = ContactResolver::new(&structure);
        assert_eq!(
            resolver.resolve(&OracleResidue::new("A", 1, "ALA")),
            Ok(rid(&structure, "A", 1))
        );
    }

    #[test]
    fn missing_chain_is_an_error() {
        let rows = rows();
        let structure = build_structure("c", &rows).unwrap();
        let oracle = KdTreeContactOracle::from_records(&rows);
        assert_eq!(
            ContactResolver::new(&structure).residue_pairs(&oracle, "A", "Q", 5.0),
            Err(ContactError::MissingChain("Q".to_string()))
        );
    }

    #[test]
    fn atom_pairs_respect_cutoff() {
        let structure = build_structure("c", &rows()).unwrap();
        let pairs = ContactResolver::new(&structure).atom_pairs("A", "B", 3.0).unwrap();
        // Only A1:CA -> B1:CA at exactly 3.0 A.
        assert_eq!(pairs.len(), 1);
        let pair = pairs.iter().next().unwrap();
        for atom_id in pair.items() {
            assert_eq!(structure.atom(atom_id).unwrap().name, "CA");
        }
    }
}
