use super::query::{Query, QueryKind};
use crate::core::contacts::{ContactResolver, KdTreeContactOracle};
use crate::core::graph::builder::GraphBuilder;
use crate::core::graph::{Graph, GraphLevel};
use crate::core::io::archive::GraphRecord;
use crate::core::io::pdb::{PdbFile, StructureReadError, structure_id_from_path};
use crate::core::io::pssm::PssmTable;
use crate::core::models::builder::{AtomRecord, build_structure};
use crate::core::models::structure::Structure;
use crate::engine::deadline::{CancellationToken, Deadline};
use crate::engine::error::QueryError;
use crate::engine::features::{FeatureContext, FeaturePlan, VariantSite};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Runs one query from structure file to encoded record.
///
/// Nothing is written here; the caller persists the record only once every stage has
/// succeeded.
pub fn run_query(
    id: &str,
    query: &Query,
    plan: &FeaturePlan,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<GraphRecord, QueryError> {
    let records = PdbFile::read_records_from_path(&query.structure_path)
        .map_err(StructureReadError::from)?;
    let structure = build_structure(&structure_id_from_path(&query.structure_path), &records)
        .map_err(StructureReadError::from)?;
    let pssms = load_pssms(query)?;

    let (mut graph, variant) = build_graph(id, query, &structure, &records)?;
    for (name, value) in &query.targets {
        graph.set_target(name, *value);
    }
    debug!(
        query = id,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Built graph."
    );

    let mut ctx = FeatureContext::new(
        &query.structure_path,
        &structure,
        &pssms,
        Deadline::after(timeout),
        cancel,
    );
    match &query.kind {
        QueryKind::Interface { chain1, chain2 } => ctx = ctx.with_interface(chain1, chain2),
        QueryKind::Variant { .. } => {
            if let Some(site) = variant {
                ctx = ctx.with_variant(site);
            }
        }
    }
    plan.dispatch(&ctx, &mut graph)?;

    Ok(GraphRecord::from_graph(&graph, &structure)?)
}

fn load_pssms(query: &Query) -> Result<HashMap<String, PssmTable>, QueryError> {
    query
        .pssm_paths
        .iter()
        .map(|(chain, path)| {
            PssmTable::from_path(path)
                .map(|table| (chain.clone(), table))
                .map_err(|source| QueryError::Pssm {
                    chain: chain.clone(),
                    path: path.clone(),
                    source,
                })
        })
        .collect()
}

fn build_graph(
    id: &str,
    query: &Query,
    structure: &Structure,
    records: &[AtomRecord],
) -> Result<(Graph, Option<VariantSite>), QueryError> {
    let builder = GraphBuilder::new(structure);
    match &query.kind {
        QueryKind::Interface { chain1, chain2 } => {
            let resolver = ContactResolver::new(structure);
            let graph = match query.level {
                GraphLevel::Residue => {
                    let oracle = KdTreeContactOracle::from_records(records);
                    let pairs = resolver.residue_pairs(&oracle, chain1, chain2, query.cutoff)?;
                    builder.interface_residue_graph(id, &pairs)?
                }
                GraphLevel::Atomic => {
                    let pairs = resolver.atom_pairs(chain1, chain2, query.cutoff)?;
                    builder.interface_atom_graph(id, &pairs)?
                }
            };
            if graph.node_count() == 0 {
                return Err(QueryError::InvalidQuery(format!(
                    "no contacts between chains '{chain1}' and '{chain2}' within {} Å",
                    query.cutoff
                )));
            }
            Ok((graph, None))
        }
        QueryKind::Variant {
            chain,
            locus,
            wildtype,
            variant,
        } => {
            let residue_id = structure
                .find_chain_by_id(chain)
                .and_then(|chain_id| structure.find_residue(chain_id, *locus))
                .ok_or_else(|| {
                    QueryError::InvalidQuery(format!("residue {chain}:{locus} not found"))
                })?;
            let found = structure
                .residue(residue_id)
                .and_then(|residue| residue.amino_acid);
            if found != Some(*wildtype) {
                return Err(QueryError::InvalidQuery(format!(
                    "residue {} is not the wildtype {}",
                    structure.residue_label(residue_id),
                    wildtype.three_letter_code()
                )));
            }

            let graph =
                builder.variant_graph(id, query.level, residue_id, query.radius, query.cutoff)?;
            let site = VariantSite {
                residue: residue_id,
                wildtype: *wildtype,
                variant: *variant,
            };
            Ok((graph, Some(site)))
        }
    }
}
