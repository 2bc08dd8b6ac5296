//! Feature modules and their dispatch.
//!
//! A [`FeatureModule`] adds named values to the nodes or edges of a [`Graph`]. Modules are
//! selected through a [`FeatureSelection`], which is resolved once into a [`FeaturePlan`]
//! before any query is processed; the plan then runs its modules in order on every graph.

pub mod components;
pub mod conservation;
pub mod contact;
pub mod exposure;
pub mod irc;

use super::config::ConfigError;
use super::deadline::{CancellationToken, Deadline};
use super::error::EngineError;
use crate::core::graph::{Graph, NodeKey};
use crate::core::io::pssm::{PssmError, PssmTable};
use crate::core::models::amino_acid::{AminoAcid, AminoAcidError};
use crate::core::models::ids::ResidueId;
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Name accepted everywhere a module list is expected, meaning every built-in module.
pub const ALL_MODULES: &str = "all";

/// Modules run when no selection is given: graph topology, residue identity and distances.
pub const DEFAULT_MODULES: [&str; 2] = [components::NAME, contact::NAME];

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature computation exceeded its {budget:?} budget (elapsed {elapsed:?})")]
    Timeout { elapsed: Duration, budget: Duration },
    #[error("Feature computation was cancelled")]
    Cancelled,
    #[error("Residue {residue} is not a canonical amino acid")]
    NonProtein { residue: String },
    #[error("No PSSM table was provided for chain '{chain}'")]
    MissingPssm { chain: String },
    #[error("PSSM lookup for residue {residue} failed: {source}")]
    Pssm {
        residue: String,
        #[source]
        source: PssmError,
    },
    #[error(transparent)]
    AminoAcid(#[from] AminoAcidError),
    #[error("Graph node {0:?} is not part of the structure")]
    UnknownNode(NodeKey),
}

/// The amino-acid substitution of a variant query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantSite {
    pub residue: ResidueId,
    pub wildtype: &'static AminoAcid,
    pub variant: &'static AminoAcid,
}

/// Everything a module may read while decorating one graph.
pub struct FeatureContext<'a> {
    pub structure_path: &'a Path,
    pub structure: &'a Structure,
    pub variant: Option<VariantSite>,
    /// The two chains of an interface query.
    pub interface: Option<(&'a str, &'a str)>,
    pssms: &'a HashMap<String, PssmTable>,
    deadline: Deadline,
    cancel: &'a CancellationToken,
}

impl<'a> FeatureContext<'a> {
    pub fn new(
        structure_path: &'a Path,
        structure: &'a Structure,
        pssms: &'a HashMap<String, PssmTable>,
        deadline: Deadline,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            structure_path,
            structure,
            variant: None,
            interface: None,
            pssms,
            deadline,
            cancel,
        }
    }

    pub fn with_variant(mut self, variant: VariantSite) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_interface(mut self, chain1: &'a str, chain2: &'a str) -> Self {
        self.interface = Some((chain1, chain2));
        self
    }

    /// Fails once the query's deadline has passed or processing was cancelled.
    ///
    /// Modules with long loops call this periodically.
    pub fn checkpoint(&self) -> Result<(), FeatureError> {
        if self.cancel.is_cancelled() {
            return Err(FeatureError::Cancelled);
        }
        if self.deadline.is_expired() {
            return Err(FeatureError::Timeout {
                elapsed: self.deadline.elapsed(),
                budget: self.deadline.budget(),
            });
        }
        Ok(())
    }

    pub fn pssm(&self, chain_id: &str) -> Result<&'a PssmTable, FeatureError> {
        self.pssms.get(chain_id).ok_or_else(|| FeatureError::MissingPssm {
            chain: chain_id.to_string(),
        })
    }

    /// The residue a node stands for; atoms map to their owning residue.
    pub fn residue_id_of(&self, node: NodeKey) -> Result<ResidueId, FeatureError> {
        match node {
            NodeKey::Residue(rid) if self.structure.residue(rid).is_some() => Ok(rid),
            NodeKey::Atom(aid) => self
                .structure
                .atom(aid)
                .map(|atom| atom.residue_id)
                .ok_or(FeatureError::UnknownNode(node)),
            NodeKey::Residue(_) => Err(FeatureError::UnknownNode(node)),
        }
    }

    pub fn residue_of(&self, node: NodeKey) -> Result<(ResidueId, &'a Residue), FeatureError> {
        let rid = self.residue_id_of(node)?;
        self.structure
            .residue(rid)
            .map(|residue| (rid, residue))
            .ok_or(FeatureError::UnknownNode(node))
    }

    /// The amino acid of a residue, rejecting non-protein residues.
    pub fn amino_acid_of(&self, residue_id: ResidueId) -> Result<&'static AminoAcid, FeatureError> {
        self.structure
            .residue(residue_id)
            .and_then(|residue| residue.amino_acid)
            .ok_or_else(|| FeatureError::NonProtein {
                residue: self.structure.residue_label(residue_id),
            })
    }

    pub fn is_variant_residue(&self, residue_id: ResidueId) -> bool {
        self.variant.is_some_and(|v| v.residue == residue_id)
    }
}

/// A unit of feature computation.
pub trait FeatureModule: Send + Sync {
    /// Stable name used to select the module.
    fn name(&self) -> &'static str;

    /// Adds this module's features to `graph`.
    fn add_features(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), FeatureError>;
}

/// Every built-in module, in registry order.
pub fn builtin_modules() -> Vec<Arc<dyn FeatureModule>> {
    vec![
        Arc::new(components::Components),
        Arc::new(contact::Contact),
        Arc::new(conservation::Conservation),
        Arc::new(exposure::Exposure::default()),
        Arc::new(irc::InterResidueContacts::default()),
    ]
}

/// Looks up a built-in module by name.
pub fn module_by_name(name: &str) -> Option<Arc<dyn FeatureModule>> {
    builtin_modules().into_iter().find(|m| m.name() == name)
}

/// Which feature modules to run.
#[derive(Clone, Default)]
pub enum FeatureSelection {
    /// The modules named in [`DEFAULT_MODULES`].
    #[default]
    Default,
    /// Every built-in module.
    All,
    Names(Vec<String>),
    Modules(Vec<Arc<dyn FeatureModule>>),
}

impl FeatureSelection {
    /// Normalizes the selection into an ordered list of module handles.
    ///
    /// Duplicates are dropped, keeping the first occurrence. The name `"all"` inside a name
    /// list expands to every built-in module.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFeatureModule`] for a name with no built-in module.
    pub fn resolve(&self) -> Result<FeaturePlan, ConfigError> {
        let candidates: Vec<Arc<dyn FeatureModule>> = match self {
            FeatureSelection::Default => resolve_names(DEFAULT_MODULES.iter().copied())?,
            FeatureSelection::All => builtin_modules(),
            FeatureSelection::Names(names) => resolve_names(names.iter().map(String::as_str))?,
            FeatureSelection::Modules(modules) => modules.clone(),
        };

        let mut modules: Vec<Arc<dyn FeatureModule>> = Vec::with_capacity(candidates.len());
        for module in candidates {
            if !modules.iter().any(|m| m.name() == module.name()) {
                modules.push(module);
            }
        }
        Ok(FeaturePlan { modules })
    }
}

fn resolve_names<'n>(
    names: impl Iterator<Item = &'n str>,
) -> Result<Vec<Arc<dyn FeatureModule>>, ConfigError> {
    let mut modules = Vec::new();
    for name in names {
        let name = name.trim();
        if name.eq_ignore_ascii_case(ALL_MODULES) {
            modules.extend(builtin_modules());
        } else {
            modules.push(
                module_by_name(name)
                    .ok_or_else(|| ConfigError::UnknownFeatureModule(name.to_string()))?,
            );
        }
    }
    Ok(modules)
}

impl fmt::Debug for FeatureSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSelection::Default => f.write_str("Default"),
            FeatureSelection::All => f.write_str("All"),
            FeatureSelection::Names(names) => f.debug_tuple("Names").field(names).finish(),
            FeatureSelection::Modules(modules) => f
                .debug_tuple("Modules")
                .field(&modules.iter().map(|m| m.name()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl From<&str> for FeatureSelection {
    fn from(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case(ALL_MODULES) {
            FeatureSelection::All
        } else {
            FeatureSelection::Names(vec![name.to_string()])
        }
    }
}

impl From<Vec<String>> for FeatureSelection {
    fn from(names: Vec<String>) -> Self {
        FeatureSelection::Names(names)
    }
}

impl From<&[&str]> for FeatureSelection {
    fn from(names: &[&str]) -> Self {
        FeatureSelection::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Arc<dyn FeatureModule>> for FeatureSelection {
    fn from(module: Arc<dyn FeatureModule>) -> Self {
        FeatureSelection::Modules(vec![module])
    }
}

impl From<Vec<Arc<dyn FeatureModule>>> for FeatureSelection {
    fn from(modules: Vec<Arc<dyn FeatureModule>>) -> Self {
        FeatureSelection::Modules(modules)
    }
}

/// An ordered, validated list of modules ready to run.
#[derive(Clone)]
pub struct FeaturePlan {
    modules: Vec<Arc<dyn FeatureModule>>,
}

impl FeaturePlan {
    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Runs every module on `graph`, in plan order.
    ///
    /// The deadline and cancellation are checked before each module as well as inside the
    /// modules themselves. The first failing module aborts the dispatch.
    pub fn dispatch(&self, ctx: &FeatureContext<'_>, graph: &mut Graph) -> Result<(), EngineError> {
        for module in &self.modules {
            let name = module.name();
            ctx.checkpoint()
                .and_then(|()| module.add_features(ctx, graph))
                .map_err(|source| EngineError::from_feature(name, source))?;
            trace!(graph = graph.id(), module = name, "Feature module finished.");
        }
        Ok(())
    }
}

impl fmt::Debug for FeaturePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FeaturePlan").field(&self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::contacts::{ContactResolver, KdTreeContactOracle};
    use crate::core::graph::builder::GraphBuilder;
    use crate::core::models::builder::tests::record;
    use crate::core::models::builder::{AtomRecord, build_structure};
    use crate::core::models::residue::ResidueLocus;
    use std::path::PathBuf;

    /// A small two-chain interface with backbone-like CA traces and a few side-chain atoms.
    pub(crate) fn interface_rows() -> Vec<AtomRecord> {
        vec![
            record(1, "N", "ALA", "A", 1, [-1.2, 0.0, 0.0]),
            record(2, "CA", "ALA", "A", 1, [0.0, 0.0, 0.0]),
            record(3, "CB", "ALA", "A", 1, [0.0, 1.5, 0.0]),
            record(4, "CA", "LYS", "A", 2, [3.8, 0.0, 0.0]),
            record(5, "CB", "LYS", "A", 2, [3.8, 1.5, 0.0]),
            record(6, "CA", "SER", "A", 3, [7.6, 0.0, 0.0]),
            record(7, "CA", "ASP", "B", 1, [0.0, 5.0, 0.0]),
            record(8, "CA", "GLU", "B", 2, [3.8, 5.0, 0.0]),
            record(9, "CA", "PHE", "B", 3, [30.0, 5.0, 0.0]),
        ]
    }

    pub(crate) fn residue(structure: &Structure, chain: &str, number: i32) -> ResidueId {
        let chain_id = structure.find_chain_by_id(chain).unwrap();
        structure.find_residue(chain_id, ResidueLocus::from(number)).unwrap()
    }

    pub(crate) fn interface_graph(structure: &Structure, rows: &[AtomRecord]) -> Graph {
        let oracle = KdTreeContactOracle::from_records(rows);
        let contacts = ContactResolver::new(structure)
            .residue_pairs(&oracle, "A", "B", 4.5)
            .unwrap();
        GraphBuilder::new(structure)
            .interface_residue_graph("residue-ppi:A-B:test", &contacts)
            .unwrap()
    }

    pub(crate) struct Fixture {
        pub path: PathBuf,
        pub structure: Structure,
        pub pssms: HashMap<String, PssmTable>,
        pub cancel: CancellationToken,
    }

    impl Fixture {
        pub(crate) fn new(rows: &[AtomRecord]) -> Self {
            Self {
                path: PathBuf::from("test.pdb"),
                structure: build_structure("test", rows).unwrap(),
                pssms: HashMap::new(),
                cancel: CancellationToken::new(),
            }
        }

        pub(crate) fn context(&self) -> FeatureContext<'_> {
            FeatureContext::new(
                &self.path,
                &self.structure,
                &self.pssms,
                Deadline::after(Duration::from_secs(60)),
                &self.cancel,
            )
        }
    }

    #[test]
    fn default_selection_is_components_and_contact() {
        let plan = FeatureSelection::Default.resolve().unwrap();
        assert_eq!(plan.names(), vec!["components", "contact"]);
    }

    #[test]
    fn all_is_a_superset_of_default() {
        let all = FeatureSelection::from("all").resolve().unwrap();
        for name in DEFAULT_MODULES {
            assert!(all.contains(name));
        }
        assert_eq!(
            all.names(),
            vec!["components", "contact", "conservation", "exposure", "irc"]
        );
    }

    #[test]
    fn unknown_name_is_a_config_error() {
        let err = FeatureSelection::from(vec!["contact".to_string(), "sasa".to_string()])
            .resolve()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownFeatureModule("sasa".to_string()));
    }

    #[test]
    fn duplicates_are_dropped_keeping_first_position() {
        let plan = FeatureSelection::from(vec![
            "contact".to_string(),
            "components".to_string(),
            "contact".to_string(),
        ])
        .resolve()
        .unwrap();
        assert_eq!(plan.names(), vec!["contact", "components"]);
    }

    #[test]
    fn single_name_and_single_module_resolve_identically() {
        let by_name = FeatureSelection::from("contact").resolve().unwrap();
        let by_module = FeatureSelection::from(module_by_name("contact").unwrap())
            .resolve()
            .unwrap();
        assert_eq!(by_name.names(), by_module.names());
    }

    #[test]
    fn by_name_and_by_module_produce_identical_features() {
        let rows = interface_rows();
        let fixture = Fixture::new(&rows);
        let names = FeatureSelection::from(&["components", "contact"][..])
            .resolve()
            .unwrap();
        let modules = FeatureSelection::from(vec![
            module_by_name("components").unwrap(),
            module_by_name("contact").unwrap(),
        ])
        .resolve()
        .unwrap();

        let mut by_name = interface_graph(&fixture.structure, &rows);
        let mut by_module = by_name.clone();
        names.dispatch(&fixture.context(), &mut by_name).unwrap();
        modules.dispatch(&fixture.context(), &mut by_module).unwrap();

        let collect = |g: &Graph| {
            (
                g.nodes().map(|(k, f)| (k, f.clone())).collect::<Vec<_>>(),
                g.edges().map(|(e, f)| (e, f.clone())).collect::<Vec<_>>(),
            )
        };
        assert_eq!(collect(&by_name), collect(&by_module));
    }

    #[test]
    fn cancelled_dispatch_stops_before_first_module() {
        let rows = interface_rows();
        let fixture = Fixture::new(&rows);
        let mut graph = interface_graph(&fixture.structure, &rows);
        fixture.cancel.cancel();

        let err = FeatureSelection::Default
            .resolve()
            .unwrap()
            .dispatch(&fixture.context(), &mut graph)
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert!(graph.nodes().all(|(_, f)| f.is_empty()));
    }

    #[test]
    fn expired_deadline_is_a_timeout() {
        let rows = interface_rows();
        let fixture = Fixture::new(&rows);
        let mut graph = interface_graph(&fixture.structure, &rows);
        let ctx = FeatureContext::new(
            &fixture.path,
            &fixture.structure,
            &fixture.pssms,
            Deadline::after(Duration::ZERO),
            &fixture.cancel,
        );
        std::thread::sleep(Duration::from_millis(2));

        let err = FeatureSelection::All
            .resolve()
            .unwrap()
            .dispatch(&ctx, &mut graph)
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[test]
    fn residue_of_maps_atoms_to_owning_residue() {
        let rows = interface_rows();
        let fixture = Fixture::new(&rows);
        let ctx = fixture.context();
        let rid = residue(&fixture.structure, "A", 2);
        let atom = fixture.structure.residue(rid).unwrap().atoms()[0];
        assert_eq!(ctx.residue_id_of(NodeKey::Atom(atom)).unwrap(), rid);
        assert_eq!(ctx.residue_id_of(NodeKey::Residue(rid)).unwrap(), rid);
    }
}
