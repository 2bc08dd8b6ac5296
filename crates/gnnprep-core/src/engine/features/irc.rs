use super::{FeatureContext, FeatureError, FeatureModule};
use crate::core::graph::Graph;
use crate::core::models::amino_acid::Polarity;
use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry;
use std::collections::HashMap;

pub const NAME: &str = "irc";

pub const DEFAULT_IRC_CUTOFF: f64 = 5.5;

/// Inter-residue contact counts across an interface.
///
/// Each node counts the protein residues of the partner chain within `cutoff` of its
/// residue, in total and per partner polarity. Graphs without an interface are left alone.
pub struct InterResidueContacts {
    pub cutoff: f64,
}

impl Default for InterResidueContacts {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_IRC_CUTOFF,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ContactCounts {
    total: u32,
    by_polarity: [u32; Polarity::COUNT],
}

impl ContactCounts {
    fn record(&mut self, polarity: Polarity) {
        self.total += 1;
        self.by_polarity[polarity.index()] += 1;
    }

    fn get(&self, polarity: Polarity) -> f64 {
        f64::from(self.by_polarity[polarity.index()])
    }
}

impl FeatureModule for InterResidueContacts {
    fn name(&self) -> &'static str {
        NAME
    }

    fn add_features(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), FeatureError> {
        let Some((chain1, chain2)) = ctx.interface else {
            return Ok(());
        };
        let partners1 = protein_residues(ctx.structure, chain1);
        let partners2 = protein_residues(ctx.structure, chain2);

        let mut cache: HashMap<ResidueId, ContactCounts> = HashMap::new();
        for (node, features) in graph.nodes_mut() {
            let residue_id = ctx.residue_id_of(node)?;
            let counts = match cache.get(&residue_id) {
                Some(counts) => *counts,
                None => {
                    ctx.checkpoint()?;
                    let partners: &[(ResidueId, Polarity)] =
                        match ctx.structure.chain_id_of(residue_id) {
                            Some(chain) if chain == chain1 => &partners2,
                            Some(chain) if chain == chain2 => &partners1,
                            _ => &[],
                        };
                    let counts = self.count(ctx.structure, residue_id, partners);
                    cache.insert(residue_id, counts);
                    counts
                }
            };

            features.insert("irc_total", f64::from(counts.total));
            features.insert("irc_nonpolar", counts.get(Polarity::Nonpolar));
            features.insert("irc_polar", counts.get(Polarity::Polar));
            features.insert("irc_negative", counts.get(Polarity::Negative));
            features.insert("irc_positive", counts.get(Polarity::Positive));
        }
        Ok(())
    }
}

impl InterResidueContacts {
    fn count(
        &self,
        structure: &Structure,
        residue_id: ResidueId,
        partners: &[(ResidueId, Polarity)],
    ) -> ContactCounts {
        let mut counts = ContactCounts::default();
        for &(partner, polarity) in partners {
            if geometry::within_distance(structure, residue_id, partner, self.cutoff) {
                counts.record(polarity);
            }
        }
        counts
    }
}

fn protein_residues(structure: &Structure, chain: &str) -> Vec<(ResidueId, Polarity)> {
    let Some(chain_id) = structure.find_chain_by_id(chain) else {
        return Vec::new();
    };
    structure
        .chain(chain_id)
        .map(|chain| {
            chain
                .residues()
                .iter()
                .filter_map(|&rid| {
                    let amino_acid = structure.residue(rid)?.amino_acid?;
                    Some((rid, amino_acid.polarity()))
                })
                .collect()
        })
        .unwrap_or_default()
}
