use super::ContactError;
use crate::core::models::amino_acid::AminoAcid;
use crate::core::models::builder::AtomRecord;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Residue identity as reported by a contact oracle: chain, number and name.
///
/// Insertion codes are not part of the key; the resolver reconciles keys with the parsed
/// structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OracleResidue {
    pub chain_id: String,
    pub residue_number: i32,
    pub residue_name: String,
}

impl OracleResidue {
    pub fn new(chain_id: &str, residue_number: i32, residue_name: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            residue_number,
            residue_name: residue_name.to_string(),
        }
    }

    fn of(record: &AtomRecord) -> Self {
        Self::new(&record.chain_id, record.residue_number, &record.residue_name)
    }
}

impl fmt::Display for OracleResidue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.chain_id, self.residue_number, self.residue_name
        )
    }
}

/// Residues of `chain1` mapped to the residues of `chain2` they touch.
pub type ContactMap = HashMap<OracleResidue, Vec<OracleResidue>>;

/// Source of atomic contacts between two chains.
///
/// Implementations report, for every residue of `chain1` with at least one atom within
/// `cutoff` of an atom of `chain2`, the list of such `chain2` residues.
pub trait ContactOracle: Send + Sync {
    fn contact_residues(
        &self,
        cutoff: f64,
        chain1: &str,
        chain2: &str,
    ) -> Result<ContactMap, ContactError>;
}

/// Contact oracle backed by a k-d tree over raw atom rows.
///
/// The oracle keeps its own copy of the rows, independent of any parsed structure. Only
/// primary-conformation rows are indexed, and by default only rows of canonical amino-acid
/// residues. Of several rows naming the same atom, only the one with the highest occupancy
/// is kept (the first on ties), matching the atoms a parsed structure retains.
#[derive(Debug, Clone)]
pub struct KdTreeContactOracle {
    records: Vec<AtomRecord>,
}

impl KdTreeContactOracle {
    pub fn from_records(records: &[AtomRecord]) -> Self {
        Self::with_filter(records, true)
    }

    /// Like [`from_records`](Self::from_records), but optionally keeps non-protein rows too.
    pub fn with_filter(records: &[AtomRecord], protein_only: bool) -> Self {
        let mut kept: Vec<AtomRecord> = Vec::with_capacity(records.len());
        let mut slots: HashMap<(&str, i32, Option<char>, &str), usize> = HashMap::new();

        for record in records
            .iter()
            .filter(|r| r.is_primary_conformation())
            .filter(|r| !protein_only || AminoAcid::from_three_letter_code(&r.residue_name).is_some())
        {
            let key = (
                record.chain_id.as_str(),
                record.residue_number,
                record.insertion_code,
                record.atom_name.as_str(),
            );
            match slots.get(&key) {
                Some(&slot) if kept[slot].occupancy < record.occupancy => {
                    kept[slot] = record.clone();
                }
                Some(_) => {}
                None => {
                    slots.insert(key, kept.len());
                    kept.push(record.clone());
                }
            }
        }
        Self { records: kept }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ContactOracle for KdTreeContactOracle {
    fn contact_residues(
        &self,
        cutoff: f64,
        chain1: &str,
        chain2: &str,
    ) -> Result<ContactMap, ContactError> {
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(ContactError::InvalidCutoff(cutoff));
        }

        let partners: Vec<&AtomRecord> = self
            .records
            .iter()
            .filter(|r| r.chain_id == chain2)
            .collect();
        let mut contacts = ContactMap::new();
        if partners.is_empty() {
            return Ok(contacts);
        }

        let points: Vec<[f64; 3]> = partners.iter().map(|r| [r.x, r.y, r.z]).collect();
        let tree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(&points);

        let cutoff_sq = cutoff * cutoff;
        let mut seen: HashSet<(OracleResidue, OracleResidue)> = HashSet::new();
        for record in self.records.iter().filter(|r| r.chain_id == chain1) {
            let query = [record.x, record.y, record.z];
            let mut hits = tree.within::<SquaredEuclidean>(&query, search_radius(cutoff_sq));
            hits.sort_by_key(|hit| hit.item);

            for hit in hits.into_iter().filter(|hit| hit.distance <= cutoff_sq) {
                let key = OracleResidue::of(record);
                let partner = OracleResidue::of(partners[hit.item as usize]);
                if seen.insert((key.clone(), partner.clone())) {
                    contacts.entry(key).or_default().push(partner);
                }
            }
        }
        Ok(contacts)
    }
}

/// Squared search radius padded by a relative epsilon so boundary contacts are found; hits
/// are filtered against the exact squared cutoff afterwards.
fn search_radius(cutoff_sq: f64) -> f64 {
    cutoff_sq * (1.0 + 1e-9) + 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::tests::record;

    fn rows() -> Vec<AtomRecord> {
        vec![
            record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(2, "CA", "GLY", "A", 2, [10.0, 0.0, 0.0]),
            record(3, "CA", "LYS", "B", 7, [0.0, 4.0, 0.0]),
            record(4, "CB", "LYS", "B", 7, [0.0, 3.0, 0.0]),
            record(5, "O", "HOH", "B", 301, [10.0, 1.0, 0.0]),
        ]
    }

    #[test]
    fn reports_each_partner_residue_once() {
        let oracle = KdTreeContactOracle::from_records(&rows());
        let contacts = oracle.contact_residues(5.0, "A", "B").unwrap();

        assert_eq!(contacts.len(), 1);
        let partners = &contacts[&OracleResidue::new("A", 1, "ALA")];
        assert_eq!(partners, &vec![OracleResidue::new("B", 7, "LYS")]);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let oracle = KdTreeContactOracle::from_records(&rows());
        let contacts = oracle.contact_residues(3.0, "A", "B").unwrap();
        assert!(contacts.contains_key(&OracleResidue::new("A", 1, "ALA")));
        assert!(oracle.contact_residues(2.99, "A", "B").unwrap().is_empty());
    }

    #[test]
    fn non_protein_rows_are_ignored_by_default() {
        let protein_only = KdTreeContactOracle::from_records(&rows());
        assert!(
            !protein_only
                .contact_residues(5.0, "A", "B")
                .unwrap()
                .contains_key(&OracleResidue::new("A", 2, "GLY"))
        );

        let everything = KdTreeContactOracle::with_filter(&rows(), false);
        let contacts = everything.contact_residues(5.0, "A", "B").unwrap();
        assert_eq!(
            contacts[&OracleResidue::new("A", 2, "GLY")],
            vec![OracleResidue::new("B", 301, "HOH")]
        );
    }

    #[test]
    fn non_primary_altlocs_are_not_indexed() {
        let mut rows = rows();
        rows[3].altloc = Some('B');
        let oracle = KdTreeContactOracle::from_records(&rows);
        assert_eq!(oracle.len(), 3);
        assert!(oracle.contact_residues(3.5, "A", "B").unwrap().is_empty());
    }

    #[test]
    fn lower_occupancy_duplicates_are_not_indexed() {
        let mut near = record(2, "CB", "ASP", "B", 1, [0.0, 3.0, 0.0]);
        near.occupancy = 0.3;
        let mut far = record(3, "CB", "ASP", "B", 1, [0.0, 20.0, 0.0]);
        far.occupancy = 0.7;
        let rows = vec![record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]), near, far];

        let oracle = KdTreeContactOracle::from_records(&rows);
        assert_eq!(oracle.len(), 2);
        assert!(oracle.contact_residues(5.0, "A", "B").unwrap().is_empty());
        assert_eq!(oracle.contact_residues(20.0, "A", "B").unwrap().len(), 1);
    }

    #[test]
    fn equal_occupancy_duplicates_keep_the_first_row() {
        let rows = vec![
            record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(2, "CB", "ASP", "B", 1, [0.0, 3.0, 0.0]),
            record(3, "CB", "ASP", "B", 1, [0.0, 20.0, 0.0]),
        ];
        let oracle = KdTreeContactOracle::from_records(&rows);
        assert_eq!(oracle.len(), 2);
        assert_eq!(oracle.contact_residues(5.0, "A", "B").unwrap().len(), 1);
    }

    #[test]
    fn many_partners_sharing_one_coordinate_are_searchable() {
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

        let oracle = KdTreeContactOracle::from_records(&rows);
        let contacts = oracle.contact_residues(5.0, "A", "B").unwrap();

        // Only B1 (1.5 A) and B2 (~4.3 A) are close enough.
        assert_eq!(
            contacts[&OracleResidue::new("A", 1, "ALA")],
            vec![
                OracleResidue::new("B", 1, "GLY"),
                OracleResidue::new("B", 2, "GLY"),
            ]
        );
    }

    #[test]
    fn missing_partner_chain_gives_no_contacts() {
        let oracle = KdTreeContactOracle::from_records(&rows());
        assert!(oracle.contact_residues(5.0, "A", "Z").unwrap().is_empty());
    }

    #[test]
    fn non_positive_cutoff_is_rejected() {
        let oracle = KdTreeContactOracle::from_records(&rows());
        assert!(matches!(
            oracle.contact_residues(0.0, "A", "B"),
            Err(ContactError::InvalidCutoff(_))
        ));
    }
}
