use super::{FeatureContext, FeatureError, FeatureModule};
use crate::core::graph::{Graph, NodeKey};
use crate::core::utils::geometry;

pub const NAME: &str = "contact";

/// Distances at or above this are not considered covalent bonds.
pub const COVALENT_CUTOFF: f64 = 2.1;

/// Edge geometry: distance, chain membership and covalent bonding.
///
/// Residue edges use the shortest atom-atom distance between the two residues.
pub struct Contact;

impl FeatureModule for Contact {
    fn name(&self) -> &'static str {
        NAME
    }

    fn add_features(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), FeatureError> {
        for (edge, features) in graph.edges_mut() {
            let distance = match (edge.first(), edge.second()) {
                (NodeKey::Atom(a), NodeKey::Atom(b)) => {
                    let atom_a = ctx.structure.atom(a).ok_or(FeatureError::UnknownNode(edge.first()))?;
                    let atom_b = ctx.structure.atom(b).ok_or(FeatureError::UnknownNode(edge.second()))?;
                    atom_a.distance_to(atom_b)
                }
                (NodeKey::Residue(a), NodeKey::Residue(b)) => {
                    geometry::shortest_distance(ctx.structure, a, b)
                        .ok_or(FeatureError::UnknownNode(edge.first()))?
                }
                (first, _) => return Err(FeatureError::UnknownNode(first)),
            };

            let (_, residue_a) = ctx.residue_of(edge.first())?;
            let (_, residue_b) = ctx.residue_of(edge.second())?;

            features.insert("distance", distance);
            features.insert("same_chain", residue_a.chain_id == residue_b.chain_id);
            features.insert("covalent", distance < COVALENT_CUTOFF);
        }
        Ok(())
    }
}
