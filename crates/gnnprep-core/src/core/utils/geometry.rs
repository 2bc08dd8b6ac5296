use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use nalgebra::{Point3, Vector3};

/// Shortest distance between any atom of `a` and any atom of `b`.
///
/// Returns `None` when either residue is unknown or has no atoms.
pub fn shortest_distance(structure: &Structure, a: ResidueId, b: ResidueId) -> Option<f64> {
    let positions_b: Vec<Point3<f64>> = structure
        .residue_atoms(b)
        .map(|(_, atom)| atom.position)
        .collect();

    structure
        .residue_atoms(a)
        .flat_map(|(_, atom_a)| {
            positions_b
                .iter()
                .map(move |pos_b| nalgebra::distance(&atom_a.position, pos_b))
        })
        .min_by(f64::total_cmp)
}

/// Whether some atom pair of `a` and `b` lies within `cutoff`. Stops at the first hit.
pub fn within_distance(structure: &Structure, a: ResidueId, b: ResidueId, cutoff: f64) -> bool {
    let cutoff_sq = cutoff * cutoff;
    structure.residue_atoms(a).any(|(_, atom_a)| {
        structure
            .residue_atoms(b)
            .any(|(_, atom_b)| nalgebra::distance_squared(&atom_a.position, &atom_b.position) <= cutoff_sq)
    })
}

/// Residues whose shortest distance to `center` is at most `radius`, in file order.
///
/// The center residue itself is always included.
pub fn residues_within(structure: &Structure, center: ResidueId, radius: f64) -> Vec<ResidueId> {
    structure
        .residues_iter()
        .map(|(id, _)| id)
        .filter(|&id| id == center || within_distance(structure, center, id, radius))
        .collect()
}

/// Position of the named atom of a residue.
pub fn atom_position(structure: &Structure, residue_id: ResidueId, name: &str) -> Option<Point3<f64>> {
    let atom_id = structure.residue(residue_id)?.get_atom_id_by_name(name)?;
    structure.atom(atom_id).map(|atom| atom.position)
}

/// Angle between two vectors in radians; `0.0` if either is degenerate.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let norms = a.norm() * b.norm();
    if norms <= f64::EPSILON {
        return 0.0;
    }
    (a.dot(b) / norms).clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::build_structure;
    use crate::core::models::builder::tests::record;
    use crate::core::models::residue::ResidueLocus;

    fn three_residues() -> Structure {
        build_structure(
            "geo",
            &[
                record(1, "N", "ALA", "A", 1, [0.0, 0.0, 0.0]),
                record(2, "CA", "ALA", "A", 1, [1.0, 0.0, 0.0]),
                record(3, "N", "GLY", "B", 1, [4.0, 0.0, 0.0]),
                record(4, "CA", "GLY", "B", 1, [9.0, 0.0, 0.0]),
                record(5, "N", "SER", "B", 2, [20.0, 0.0, 0.0]),
            ],
        )
        .unwrap()
    }

    fn residue(structure: &Structure, chain: &str, number: i32) -> ResidueId {
        let chain_id = structure.find_chain_by_id(chain).unwrap();
        structure.find_residue(chain_id, ResidueLocus::from(number)).unwrap()
    }

    #[test]
    fn shortest_distance_is_minimum_over_atom_pairs_and_symmetric() {
        let structure = three_residues();
        let a = residue(&structure, "A", 1);
        let b = residue(&structure, "B", 1);
        assert_eq!(shortest_distance(&structure, a, b), Some(3.0));
        assert_eq!(shortest_distance(&structure, b, a), Some(3.0));
    }

    #[test]
    fn within_distance_is_inclusive() {
        let structure = three_residues();
        let a = residue(&structure, "A", 1);
        let b = residue(&structure, "B", 1);
        assert!(within_distance(&structure, a, b, 3.0));
        assert!(!within_distance(&structure, a, b, 2.9));
    }

    #[test]
    fn residues_within_includes_center_and_neighbours_only() {
        let structure = three_residues();
        let a = residue(&structure, "A", 1);
        let b = residue(&structure, "B", 1);
        assert_eq!(residues_within(&structure, a, 5.0), vec![a, b]);
        assert_eq!(residues_within(&structure, a, 1.0), vec![a]);
    }

    #[test]
    fn atom_position_looks_up_by_name() {
        let structure = three_residues();
        let b = residue(&structure, "B", 1);
        assert_eq!(atom_position(&structure, b, "CA"), Some(Point3::new(9.0, 0.0, 0.0)));
        assert_eq!(atom_position(&structure, b, "CB"), None);
    }

    #[test]
    fn angle_between_handles_degenerate_vectors() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 2.0, 0.0);
        assert!((angle_between(&x, &y) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(angle_between(&x, &Vector3::zeros()), 0.0);
    }
}
