use super::{FeatureContext, FeatureError, FeatureModule};
use crate::core::graph::Graph;
use crate::core::io::pssm::PssmRow;
use crate::core::models::ids::ResidueId;

pub const NAME: &str = "conservation";

/// Position-specific scoring matrix values of each node's residue.
///
/// Every chain that contributes a node needs a PSSM table. On variant graphs the variant
/// residue also gets the score gained by the substitution.
pub struct Conservation;

impl FeatureModule for Conservation {
    fn name(&self) -> &'static str {
        NAME
    }

    fn add_features(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), FeatureError> {
        for (node, features) in graph.nodes_mut() {
            let (residue_id, _) = ctx.residue_of(node)?;
            let row = pssm_row(ctx, residue_id)?;

            features.insert("pssm", row.scores);
            features.insert("info_content", row.information_content);

            if let Some(variant) = ctx.variant {
                let gain = if variant.residue == residue_id {
                    row.score_for(variant.variant)? - row.score_for(variant.wildtype)?
                } else {
                    0.0
                };
                features.insert("diff_conservation", gain);
            }
        }
        Ok(())
    }
}

fn pssm_row<'a>(ctx: &FeatureContext<'a>, residue_id: ResidueId) -> Result<&'a PssmRow, FeatureError> {
    let chain = ctx
        .structure
        .chain_id_of(residue_id)
        .ok_or(FeatureError::UnknownNode(residue_id.into()))?;
    let residue = ctx
        .structure
        .residue(residue_id)
        .ok_or(FeatureError::UnknownNode(residue_id.into()))?;

    ctx.pssm(chain)?
        .require(residue.locus())
        .map_err(|source| FeatureError::Pssm {
            residue: ctx.structure.residue_label(residue_id),
            source,
        })
}
