use super::{FeatureContext, FeatureError, FeatureModule};
use crate::core::graph::Graph;
use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry;
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const NAME: &str = "exposure";

pub const DEFAULT_HSE_RADIUS: f64 = 13.0;

/// Consecutive CA atoms at least this far apart belong to different peptides.
pub const PEPTIDE_BREAK: f64 = 4.3;

/// Half-sphere exposure from CA atoms.
///
/// For every residue with a peptide neighbour on both sides, the CA atoms of other peptide
/// residues within `radius` are split into the half sphere pointing along the pseudo-CB
/// direction (up) and the opposite one (down). The third value is the angle in radians
/// between the pseudo-CB direction and the real CA-CB bond, or `0.0` without a CB atom.
/// Residues lacking a neighbour on either side get `(0, 0, 0)`.
pub struct Exposure {
    pub radius: f64,
}

impl Default for Exposure {
    fn default() -> Self {
        Self {
            radius: DEFAULT_HSE_RADIUS,
        }
    }
}

impl FeatureModule for Exposure {
    fn name(&self) -> &'static str {
        NAME
    }

    fn add_features(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), FeatureError> {
        let wanted: HashSet<ResidueId> = graph
            .node_keys()
            .map(|node| ctx.residue_id_of(node))
            .collect::<Result<_, _>>()?;
        let exposures = self.half_sphere_exposure(ctx, &wanted)?;

        for (node, features) in graph.nodes_mut() {
            let residue_id = ctx.residue_id_of(node)?;
            let hse = exposures.get(&residue_id).copied().unwrap_or([0.0; 3]);
            features.insert("hse", hse);
        }
        Ok(())
    }
}

/// A protein residue on a peptide, reduced to its CA atom.
#[derive(Clone, Copy)]
struct CaSite {
    residue: ResidueId,
    ca: Point3<f64>,
}

impl Exposure {
    fn half_sphere_exposure(
        &self,
        ctx: &FeatureContext<'_>,
        wanted: &HashSet<ResidueId>,
    ) -> Result<HashMap<ResidueId, [f64; 3]>, FeatureError> {
        let peptides = ca_peptides(ctx.structure);
        let sites: Vec<CaSite> = peptides.iter().flatten().copied().collect();

        let points: Vec<[f64; 3]> = sites.iter().map(|site| [site.ca.x, site.ca.y, site.ca.z]).collect();
        let tree: ImmutableKdTree<f64, 3> = ImmutableKdTree::new_from_slice(&points);
        let radius_sq = self.radius * self.radius;

        let mut exposures = HashMap::new();
        for peptide in &peptides {
            for window in peptide.windows(3) {
                let [previous, current, next] = [window[0], window[1], window[2]];
                if !wanted.contains(&current.residue) {
                    continue;
                }
                ctx.checkpoint()?;

                let pseudo_cb = (current.ca - previous.ca).normalize()
                    + (current.ca - next.ca).normalize();
                if pseudo_cb.norm() <= f64::EPSILON {
                    continue;
                }
                let pseudo_cb = pseudo_cb.normalize();

                let (mut up, mut down) = (0u32, 0u32);
                let query = [current.ca.x, current.ca.y, current.ca.z];
                for hit in tree.within::<SquaredEuclidean>(&query, radius_sq) {
                    let other = sites[hit.item as usize];
                    if other.residue == current.residue || hit.distance >= radius_sq {
                        continue;
                    }
                    let direction = other.ca - current.ca;
                    if geometry::angle_between(&direction, &pseudo_cb) < std::f64::consts::FRAC_PI_2 {
                        up += 1;
                    } else {
                        down += 1;
                    }
                }

                let angle = geometry::atom_position(ctx.structure, current.residue, "CB")
                    .map(|cb| geometry::angle_between(&(cb - current.ca), &pseudo_cb))
                    .unwrap_or(0.0);
                exposures.insert(current.residue, [f64::from(up), f64::from(down), angle]);
            }
        }

        debug!(
            structure = ctx.structure.id(),
            peptides = peptides.len(),
            residues = exposures.len(),
            "Computed half-sphere exposure."
        );
        Ok(exposures)
    }
}

/// Splits every chain into runs of protein residues whose consecutive CA atoms are
/// closer than [`PEPTIDE_BREAK`]. Runs of a single residue are not peptides.
fn ca_peptides(structure: &Structure) -> Vec<Vec<CaSite>> {
    let mut peptides = Vec::new();
    for (_, chain) in structure.chains_iter() {
        let mut current: Vec<CaSite> = Vec::new();
        for &residue_id in chain.residues() {
            let ca = structure
                .residue(residue_id)
                .filter(|residue| residue.is_protein())
                .and_then(|_| geometry::atom_position(structure, residue_id, "CA"));

            match ca {
                Some(ca) => {
                    let connected = current
                        .last()
                        .is_some_and(|last| nalgebra::distance(&last.ca, &ca) < PEPTIDE_BREAK);
                    if !connected {
                        flush(&mut current, &mut peptides);
                    }
                    current.push(CaSite {
                        residue: residue_id,
                        ca,
                    });
                }
                None => flush(&mut current, &mut peptides),
            }
        }
        flush(&mut current, &mut peptides);
    }
    peptides
}

fn flush(current: &mut Vec<CaSite>, peptides: &mut Vec<Vec<CaSite>>) {
    let run = std::mem::take(current);
    if run.len() > 1 {
        peptides.push(run);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::builder::GraphBuilder;
    use crate::core::graph::{GraphLevel, NodeKey};
    use crate::core::models::builder::AtomRecord;
    use crate::core::models::builder::tests::record;
    use crate::engine::deadline::Deadline;
    use crate::engine::features::tests::{Fixture, residue};
    use std::time::Duration;

    /// A bent chain A whose middle residue points its pseudo-CB along +y, a short chain B
    /// above it, an isolated residue and a water.
    fn rows() -> Vec<AtomRecord> {
        vec![
            record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(2, "CA", "LYS", "A", 2, [3.0, 2.0, 0.0]),
            record(3, "CB", "LYS", "A", 2, [3.0, 3.5, 0.0]),
            record(4, "CA", "SER", "A", 3, [6.0, 0.0, 0.0]),
            record(5, "CA", "GLY", "A", 4, [6.0, 10.0, 0.0]),
            record(6, "CA", "ASP", "B", 1, [3.0, 8.0, 0.0]),
            record(7, "CA", "GLU", "B", 2, [6.0, 8.0, 0.0]),
            record(8, "O", "HOH", "W", 1, [3.0, -4.0, 0.0]),
        ]
    }

    fn hse(graph: &Graph, node: NodeKey) -> Vec<f64> {
        graph
            .node_features(node)
            .and_then(|f| f.get("hse"))
            .map(|v| v.as_slice().to_vec())
            .unwrap()
    }

    fn residue_graph(fixture: &Fixture, center: ResidueId, radius: f64) -> Graph {
        GraphBuilder::new(&fixture.structure)
            .variant_graph("v", GraphLevel::Residue, center, radius, 4.5)
            .unwrap()
    }

    #[test]
    fn counts_peptide_cas_in_each_half_sphere() {
        let fixture = Fixture::new(&rows());
        let center = residue(&fixture.structure, "A", 2);
        let mut graph = residue_graph(&fixture, center, 20.0);

        Exposure::default()
            .add_features(&fixture.context(), &mut graph)
            .unwrap();

        // Up: B1 and B2. Down: A1 and A3. The isolated A4 and the water are not counted.
        let value = hse(&graph, NodeKey::Residue(center));
        assert_eq!(value[0], 2.0);
        assert_eq!(value[1], 2.0);
        assert!(value[2].abs() < 1e-9);
    }

    #[test]
    fn peptide_ends_and_breaks_get_zeros() {
        let fixture = Fixture::new(&rows());
        let center = residue(&fixture.structure, "A", 2);
        let mut graph = residue_graph(&fixture, center, 20.0);

        Exposure::default()
            .add_features(&fixture.context(), &mut graph)
            .unwrap();

        for (chain, number) in [("A", 1), ("A", 3), ("A", 4), ("B", 1)] {
            let rid = residue(&fixture.structure, chain, number);
            assert_eq!(hse(&graph, NodeKey::Residue(rid)), vec![0.0; 3]);
        }
    }

    #[test]
    fn radius_limits_the_count() {
        let fixture = Fixture::new(&rows());
        let center = residue(&fixture.structure, "A", 2);
        let mut graph = residue_graph(&fixture, center, 1.0);

        Exposure { radius: 6.5 }
            .add_features(&fixture.context(), &mut graph)
            .unwrap();

        // B2 lies at ~6.7 from the center CA.
        let value = hse(&graph, NodeKey::Residue(center));
        assert_eq!(&value[..2], &[1.0, 2.0]);
    }

    #[test]
    fn missing_cb_gives_zero_angle() {
        let mut rows = rows();
        rows.retain(|r| r.serial != 3);
        let fixture = Fixture::new(&rows);
        let center = residue(&fixture.structure, "A", 2);
        let mut graph = residue_graph(&fixture, center, 1.0);

        Exposure::default()
            .add_features(&fixture.context(), &mut graph)
            .unwrap();
        assert_eq!(hse(&graph, NodeKey::Residue(center))[2], 0.0);
    }

    #[test]
    fn atoms_take_their_residue_value() {
        let fixture = Fixture::new(&rows());
        let center = residue(&fixture.structure, "A", 2);
        let mut graph = GraphBuilder::new(&fixture.structure)
            .variant_graph("v", GraphLevel::Atomic, center, 1.0, 2.0)
            .unwrap();

        Exposure::default()
            .add_features(&fixture.context(), &mut graph)
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        for (node, _) in graph.nodes() {
            assert_eq!(&hse(&graph, node)[..2], &[2.0, 2.0]);
        }
    }

    #[test]
    fn long_peptide_in_one_plane_is_handled() {
        // 200 CAs zig-zagging along y, all at x = 1.0.
        let rows: Vec<AtomRecord> = (0..200)
            .map(|i| {
                let z = if i % 2 == 0 { 0.0 } else { 1.5 };
                record(i + 1, "CA", "GLY", "A", i as i32 + 1, [1.0, 3.6 * f64::from(i), z])
            })
            .collect();
        let fixture = Fixture::new(&rows);
        let center = residue(&fixture.structure, "A", 100);
        let mut graph = residue_graph(&fixture, center, 1.0);

        Exposure { radius: 6.5 }
            .add_features(&fixture.context(), &mut graph)
            .unwrap();

        // Only the two chain neighbours lie within the radius.
        let value = hse(&graph, NodeKey::Residue(center));
        assert_eq!(value[0] + value[1], 2.0);
    }

    #[test]
    fn expired_deadline_interrupts_the_computation() {
        let fixture = Fixture::new(&rows());
        let center = residue(&fixture.structure, "A", 2);
        let mut graph = residue_graph(&fixture, center, 20.0);
        let ctx = FeatureContext::new(
            &fixture.path,
            &fixture.structure,
            &fixture.pssms,
            Deadline::after(Duration::ZERO),
            &fixture.cancel,
        );
        std::thread::sleep(Duration::from_millis(2));

        let err = Exposure::default().add_features(&ctx, &mut graph).unwrap_err();
        assert!(matches!(err, FeatureError::Timeout { .. }));
        assert!(graph.nodes().all(|(_, f)| !f.contains("hse")));
    }
}
