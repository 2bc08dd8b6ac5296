use super::{FeatureContext, FeatureError, FeatureModule};
use crate::core::graph::features::Features;
use crate::core::graph::{Graph, NodeKey};
use crate::core::models::amino_acid::AminoAcid;

pub const NAME: &str = "components";

/// Residue identity and physico-chemical properties of every node.
///
/// Atom nodes additionally get their element and occupancy; residue values come from the
/// owning residue. On variant graphs, nodes of the variant residue also describe the
/// substitution.
pub struct Components;

impl FeatureModule for Components {
    fn name(&self) -> &'static str {
        NAME
    }

    fn add_features(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), FeatureError> {
        for (node, features) in graph.nodes_mut() {
            let (residue_id, _) = ctx.residue_of(node)?;
            let amino_acid = ctx.amino_acid_of(residue_id)?;
            insert_residue_properties(features, amino_acid)?;

            if let NodeKey::Atom(atom_id) = node {
                let atom = ctx
                    .structure
                    .atom(atom_id)
                    .ok_or(FeatureError::UnknownNode(node))?;
                features.insert("atom_type", atom.element.one_hot());
                features.insert("occupancy", atom.occupancy);
            }

            if let Some(variant) = ctx.variant {
                if variant.residue == residue_id {
                    features.insert("variant_res", variant.variant.one_hot()?);
                    insert_differences(features, variant.wildtype, variant.variant);
                } else {
                    features.insert("variant_res", amino_acid.one_hot()?);
                    insert_differences(features, amino_acid, amino_acid);
                }
            }
        }
        Ok(())
    }
}

fn insert_residue_properties(features: &mut Features, aa: &AminoAcid) -> Result<(), FeatureError> {
    features.insert("res_type", aa.one_hot()?);
    features.insert("res_charge", f64::from(aa.charge()));
    features.insert("polarity", aa.polarity().one_hot());
    features.insert("res_size", f64::from(aa.size()));
    features.insert("res_mass", aa.mass());
    features.insert("res_pI", aa.isoelectric_point());
    features.insert("hb_donors", f64::from(aa.hydrogen_bond_donors()));
    features.insert("hb_acceptors", f64::from(aa.hydrogen_bond_acceptors()));
    Ok(())
}

/// Inserts `variant - wildtype` for every property; identical arguments give zeros.
fn insert_differences(features: &mut Features, wildtype: &AminoAcid, variant: &AminoAcid) {
    let polarity: Vec<f64> = variant
        .polarity()
        .one_hot()
        .iter()
        .zip(wildtype.polarity().one_hot())
        .map(|(v, w)| v - w)
        .collect();

    features.insert(
        "diff_charge",
        f64::from(variant.charge()) - f64::from(wildtype.charge()),
    );
    features.insert("diff_polarity", polarity);
    features.insert(
        "diff_size",
        f64::from(variant.size()) - f64::from(wildtype.size()),
    );
    features.insert("diff_mass", variant.mass() - wildtype.mass());
    features.insert(
        "diff_pI",
        variant.isoelectric_point() - wildtype.isoelectric_point(),
    );
    features.insert(
        "diff_hb_donors",
        f64::from(variant.hydrogen_bond_donors()) - f64::from(wildtype.hydrogen_bond_donors()),
    );
    features.insert(
        "diff_hb_acceptors",
        f64::from(variant.hydrogen_bond_acceptors())
            - f64::from(wildtype.hydrogen_bond_acceptors()),
    );
}
