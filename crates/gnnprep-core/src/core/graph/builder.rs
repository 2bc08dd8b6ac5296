use super::pair::Pair;
use super::{Graph, GraphError, GraphLevel, NodeKey};
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::structure::Structure;
use crate::core::utils::geometry;
use std::collections::HashSet;
use tracing::trace;

/// Builds [`Graph`]s over one [`Structure`].
///
/// Nodes are inserted in the structure's file order and edges are sorted by their endpoints'
/// node positions, so the same inputs always yield the same graph layout.
pub struct GraphBuilder<'a> {
    structure: &'a Structure,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(structure: &'a Structure) -> Self {
        Self { structure }
    }

    /// A residue graph whose nodes are exactly the residues touched by some contact.
    pub fn interface_residue_graph(
        &self,
        id: &str,
        contacts: &HashSet<Pair<ResidueId>>,
    ) -> Result<Graph, GraphError> {
        let members: HashSet<ResidueId> = contacts.iter().flat_map(|pair| pair.items()).collect();
        for &residue_id in &members {
            if self.structure.residue(residue_id).is_none() {
                return Err(GraphError::UnknownResidue(residue_id));
            }
        }

        let nodes = self
            .structure
            .residues_iter()
            .map(|(rid, _)| rid)
            .filter(|rid| members.contains(rid))
            .map(NodeKey::Residue);
        let edges = contacts.iter().map(|pair| pair.map(NodeKey::Residue));

        assemble(id, GraphLevel::Residue, nodes, edges)
    }

    /// An atom graph whose nodes are exactly the atoms touched by some contact.
    pub fn interface_atom_graph(
        &self,
        id: &str,
        contacts: &HashSet<Pair<AtomId>>,
    ) -> Result<Graph, GraphError> {
        let members: HashSet<AtomId> = contacts.iter().flat_map(|pair| pair.items()).collect();
        let nodes = self
            .structure
            .atoms_iter()
            .map(|(aid, _)| aid)
            .filter(|aid| members.contains(aid))
            .map(NodeKey::Atom);
        let edges = contacts.iter().map(|pair| pair.map(NodeKey::Atom));

        assemble(id, GraphLevel::Atomic, nodes, edges)
    }

    /// A graph of the neighbourhood around one residue.
    ///
    /// The context holds `center` and every protein residue within `radius` of it (shortest
    /// atom-atom distance); waters, ions and ligands are left out. Edges join context members within `cutoff` of each other; at
    /// atom level the nodes are all atoms of the context residues.
    pub fn variant_graph(
        &self,
        id: &str,
        level: GraphLevel,
        center: ResidueId,
        radius: f64,
        cutoff: f64,
    ) -> Result<Graph, GraphError> {
        if self.structure.residue(center).is_none() {
            return Err(GraphError::UnknownResidue(center));
        }
        let context: Vec<ResidueId> = geometry::residues_within(self.structure, center, radius)
            .into_iter()
            .filter(|&rid| {
                rid == center
                    || self
                        .structure
                        .residue(rid)
                        .is_some_and(|residue| residue.is_protein())
            })
            .collect();
        trace!(graph = id, residues = context.len(), "Collected variant context.");

        match level {
            GraphLevel::Residue => {
                let mut edges = Vec::new();
                for (i, &a) in context.iter().enumerate() {
                    for &b in &context[i + 1..] {
                        if geometry::within_distance(self.structure, a, b, cutoff) {
                            edges.push(Pair::new(NodeKey::Residue(a), NodeKey::Residue(b)));
                        }
                    }
                }
                let nodes = context.iter().copied().map(NodeKey::Residue);
                assemble(id, level, nodes, edges)
            }
            GraphLevel::Atomic => {
                let atoms: Vec<_> = context
                    .iter()
                    .flat_map(|&rid| self.structure.residue_atoms(rid))
                    .collect();
                let cutoff_sq = cutoff * cutoff;
                let mut edges = Vec::new();
                for (i, (a_id, a)) in atoms.iter().enumerate() {
                    for (b_id, b) in &atoms[i + 1..] {
                        if nalgebra::distance_squared(&a.position, &b.position) <= cutoff_sq {
                            edges.push(Pair::new(NodeKey::Atom(*a_id), NodeKey::Atom(*b_id)));
                        }
                    }
                }
                let nodes = atoms.iter().map(|(aid, _)| NodeKey::Atom(*aid));
                assemble(id, level, nodes, edges)
            }
        }
    }
}

fn assemble(
    id: &str,
    level: GraphLevel,
    nodes: impl IntoIterator<Item = NodeKey>,
    edges: impl IntoIterator<Item = Pair<NodeKey>>,
) -> Result<Graph, GraphError> {
    let mut graph = Graph::new(id, level);
    for node in nodes {
        graph.add_node(node)?;
    }

    let mut edges: Vec<(usize, usize, Pair<NodeKey>)> = edges
        .into_iter()
        .map(|edge| {
            let [a, b] = edge.items();
            match (graph.node_position(a), graph.node_position(b)) {
                (Some(pa), Some(pb)) => Ok((pa.min(pb), pa.max(pb), edge)),
                (None, _) => Err(GraphError::MissingEndpoint(a)),
                (_, None) => Err(GraphError::MissingEndpoint(b)),
            }
        })
        .collect::<Result<_, _>>()?;
    edges.sort_by_key(|&(a, b, _)| (a, b));

    for (_, _, edge) in edges {
        graph.add_edge(edge)?;
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::builder::build_structure;
    use crate::core::models::builder::tests::record;
    use crate::core::models::residue::ResidueLocus;

    // Chain A residues 1..=3 along x, chain B residues 1..=2 offset in y.
    fn structure() -> Structure {
        build_structure(
            "graph",
            &[
                record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]),
                record(2, "CA", "GLY", "A", 2, [3.8, 0.0, 0.0]),
                record(3, "CA", "SER", "A", 3, [30.0, 0.0, 0.0]),
                record(4, "CA", "LYS", "B", 1, [0.0, 4.0, 0.0]),
                record(5, "CA", "ASP", "B", 2, [3.8, 4.0, 0.0]),
            ],
        )
        .unwrap()
    }

    fn rid(structure: &Structure, chain: &str, number: i32) -> ResidueId {
        let chain_id = structure.find_chain_by_id(chain).unwrap();
        structure.find_residue(chain_id, ResidueLocus::from(number)).unwrap()
    }

    #[test]
    fn interface_graph_nodes_are_union_of_contact_members() {
        let s = structure();
        let contacts: HashSet<_> = [
            Pair::new(rid(&s, "A", 1), rid(&s, "B", 1)),
            Pair::new(rid(&s, "A", 2), rid(&s, "B", 2)),
            Pair::new(rid(&s, "A", 2), rid(&s, "B", 1)),
        ]
        .into_iter()
        .collect();

        let graph = GraphBuilder::new(&s).interface_residue_graph("g", &contacts).unwrap();

        assert_eq!(graph.level(), GraphLevel::Residue);
        assert_eq!(graph.node_count(), 4);
        assert!(!graph.contains_node(NodeKey::Residue(rid(&s, "A", 3))));
        assert_eq!(graph.edge_count(), 3);
        for (edge, features) in graph.edges() {
            assert!(contacts.contains(&Pair::new(
                match edge.first() {
                    NodeKey::Residue(r) => r,
                    NodeKey::Atom(_) => unreachable!(),
                },
                match edge.second() {
                    NodeKey::Residue(r) => r,
                    NodeKey::Atom(_) => unreachable!(),
                },
            )));
            assert!(features.is_empty());
        }
    }

    #[test]
    fn interface_graph_node_order_follows_structure() {
        let s = structure();
        let contacts: HashSet<_> = [Pair::new(rid(&s, "B", 2), rid(&s, "A", 2))]
            .into_iter()
            .collect();
        let graph = GraphBuilder::new(&s).interface_residue_graph("g", &contacts).unwrap();
        let keys: Vec<NodeKey> = graph.node_keys().collect();
        assert_eq!(
            keys,
            vec![
                NodeKey::Residue(rid(&s, "A", 2)),
                NodeKey::Residue(rid(&s, "B", 2))
            ]
        );
    }

    #[test]
    fn empty_contact_set_yields_empty_graph() {
        let s = structure();
        let graph = GraphBuilder::new(&s)
            .interface_residue_graph("g", &HashSet::new())
            .unwrap();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn interface_atom_graph_uses_atom_nodes() {
        let s = structure();
        let a = s.residue(rid(&s, "A", 1)).unwrap().atoms()[0];
        let b = s.residue(rid(&s, "B", 1)).unwrap().atoms()[0];
        let contacts: HashSet<_> = [Pair::new(a, b)].into_iter().collect();
        let graph = GraphBuilder::new(&s).interface_atom_graph("g", &contacts).unwrap();
        assert_eq!(graph.level(), GraphLevel::Atomic);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains_edge(&Pair::new(NodeKey::Atom(a), NodeKey::Atom(b))));
    }

    #[test]
    fn variant_graph_collects_context_within_radius() {
        let s = structure();
        let center = rid(&s, "A", 1);
        let graph = GraphBuilder::new(&s)
            .variant_graph("v", GraphLevel::Residue, center, 10.0, 4.5)
            .unwrap();

        // A3 at 30 A is outside the radius.
        assert_eq!(graph.node_count(), 4);
        assert!(graph.contains_node(NodeKey::Residue(center)));
        assert!(!graph.contains_node(NodeKey::Residue(rid(&s, "A", 3))));
        // Pairs at 3.8 and 4.0 A are edges; diagonals at ~5.5 A are not.
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn variant_graph_leaves_out_non_protein_neighbours() {
        let s = build_structure(
            "wet",
            &[
                record(1, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]),
                record(2, "CA", "GLY", "A", 2, [3.8, 0.0, 0.0]),
                record(3, "O", "HOH", "A", 301, [0.0, 2.8, 0.0]),
                record(4, "ZN", "ZN", "A", 302, [-2.5, 0.0, 0.0]),
            ],
        )
        .unwrap();
        let center = rid(&s, "A", 1);

        for level in [GraphLevel::Residue, GraphLevel::Atomic] {
            let graph = GraphBuilder::new(&s)
                .variant_graph("v", level, center, 10.0, 4.5)
                .unwrap();
            assert_eq!(graph.node_count(), 2);
            assert_eq!(graph.edge_count(), 1);
        }
        let graph = GraphBuilder::new(&s)
            .variant_graph("v", GraphLevel::Residue, center, 10.0, 4.5)
            .unwrap();
        assert!(!graph.contains_node(NodeKey::Residue(rid(&s, "A", 301))));
    }

    #[test]
    fn variant_graph_always_contains_center() {
        let s = structure();
        let center = rid(&s, "A", 3);
        let graph = GraphBuilder::new(&s)
            .variant_graph("v", GraphLevel::Atomic, center, 5.0, 4.5)
            .unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }
}
