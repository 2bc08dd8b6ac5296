use crate::core::graph::GraphLevel;
use crate::core::io::pdb::structure_id_from_path;
use crate::core::models::amino_acid::AminoAcid;
use crate::core::models::residue::ResidueLocus;
use crate::engine::config::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Contact cutoff of residue-level interface queries, in Å.
pub const DEFAULT_RESIDUE_CUTOFF: f64 = 10.0;
/// Contact cutoff of atom-level interface queries, in Å.
pub const DEFAULT_ATOMIC_CUTOFF: f64 = 5.5;
/// Radius of the neighbourhood around a variant residue, in Å.
pub const DEFAULT_VARIANT_RADIUS: f64 = 10.0;
/// Edge cutoff inside a variant neighbourhood, in Å.
pub const DEFAULT_VARIANT_CUTOFF: f64 = 4.5;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    /// The contact interface between two chains.
    Interface { chain1: String, chain2: String },
    /// A single amino-acid substitution and its surroundings.
    Variant {
        chain: String,
        locus: ResidueLocus,
        wildtype: &'static AminoAcid,
        variant: &'static AminoAcid,
    },
}

impl QueryKind {
    fn tag(&self) -> &'static str {
        match self {
            QueryKind::Interface { .. } => "ppi",
            QueryKind::Variant { .. } => "srv",
        }
    }

    fn chains(&self) -> String {
        match self {
            QueryKind::Interface { chain1, chain2 } => format!("{chain1}-{chain2}"),
            QueryKind::Variant { chain, .. } => chain.clone(),
        }
    }
}

/// One graph to build: which structure, which part of it, and at what resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub structure_path: PathBuf,
    pub level: GraphLevel,
    pub kind: QueryKind,
    /// Labels stored with the graph, e.g. a binding affinity.
    pub targets: BTreeMap<String, f64>,
    /// PSSM table per chain id, needed by the `conservation` module.
    pub pssm_paths: BTreeMap<String, PathBuf>,
    /// Maximum distance for two residues or atoms to be joined by an edge.
    pub cutoff: f64,
    /// Neighbourhood radius around a variant residue; unused by interface queries.
    pub radius: f64,
}

impl Query {
    pub fn interface(
        structure_path: impl Into<PathBuf>,
        level: GraphLevel,
        chain1: &str,
        chain2: &str,
    ) -> Self {
        let cutoff = match level {
            GraphLevel::Residue => DEFAULT_RESIDUE_CUTOFF,
            GraphLevel::Atomic => DEFAULT_ATOMIC_CUTOFF,
        };
        Self {
            structure_path: structure_path.into(),
            level,
            kind: QueryKind::Interface {
                chain1: chain1.to_string(),
                chain2: chain2.to_string(),
            },
            targets: BTreeMap::new(),
            pssm_paths: BTreeMap::new(),
            cutoff,
            radius: DEFAULT_VARIANT_RADIUS,
        }
    }

    pub fn variant(
        structure_path: impl Into<PathBuf>,
        level: GraphLevel,
        chain: &str,
        locus: ResidueLocus,
        wildtype: &'static AminoAcid,
        variant: &'static AminoAcid,
    ) -> Self {
        Self {
            structure_path: structure_path.into(),
            level,
            kind: QueryKind::Variant {
                chain: chain.to_string(),
                locus,
                wildtype,
                variant,
            },
            targets: BTreeMap::new(),
            pssm_paths: BTreeMap::new(),
            cutoff: DEFAULT_VARIANT_CUTOFF,
            radius: DEFAULT_VARIANT_RADIUS,
        }
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_target(mut self, name: &str, value: f64) -> Self {
        self.targets.insert(name.to_string(), value);
        self
    }

    pub fn with_pssm(mut self, chain: &str, path: impl Into<PathBuf>) -> Self {
        self.pssm_paths.insert(chain.to_string(), path.into());
        self
    }

    /// Identifier before duplicate disambiguation: `<level>-<ppi|srv>:<chains>:<file stem>`.
    pub fn base_id(&self) -> String {
        format!(
            "{}-{}:{}:{}",
            self.level,
            self.kind.tag(),
            self.kind.chains(),
            structure_id_from_path(&self.structure_path)
        )
    }

    /// Checks the parameters that can be judged without reading any file.
    pub(crate) fn validate(&self, id: &str) -> Result<(), ConfigError> {
        check_distance(id, "cutoff", self.cutoff)?;
        if let QueryKind::Variant { .. } = self.kind {
            check_distance(id, "radius", self.radius)?;
        }

        let invalid = |reason: String| ConfigError::InvalidQuery {
            query: id.to_string(),
            reason,
        };
        match &self.kind {
            QueryKind::Interface { chain1, chain2 } => {
                if chain1.is_empty() || chain2.is_empty() {
                    return Err(invalid("interface chains must not be empty".to_string()));
                }
                if chain1 == chain2 {
                    return Err(invalid(format!(
                        "interface needs two different chains, got '{chain1}' twice"
                    )));
                }
            }
            QueryKind::Variant { chain, .. } => {
                if chain.is_empty() {
                    return Err(invalid("variant chain must not be empty".to_string()));
                }
            }
        }
        Ok(())
    }
}

fn check_distance(query: &str, parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveDistance {
            query: query.to_string(),
            parameter,
            value,
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            QueryKind::Interface { .. } => write!(f, "{}", self.base_id()),
            QueryKind::Variant {
                locus,
                wildtype,
                variant,
                ..
            } => write!(
                f,
                "{} ({}{}{})",
                self.base_id(),
                wildtype.one_letter_code(),
                locus,
                variant.one_letter_code()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::amino_acid::{ALANINE, LYSINE};

    #[test]
    fn interface_id_names_level_kind_chains_and_stem() {
        let query = Query::interface("data/1ATN.pdb", GraphLevel::Residue, "A", "B");
        assert_eq!(query.base_id(), "residue-ppi:A-B:1ATN");
        assert_eq!(query.cutoff, DEFAULT_RESIDUE_CUTOFF);

        let atomic = Query::interface("1ATN.pdb", GraphLevel::Atomic, "H", "L");
        assert_eq!(atomic.base_id(), "atomic-ppi:H-L:1ATN");
        assert_eq!(atomic.cutoff, DEFAULT_ATOMIC_CUTOFF);
    }

    #[test]
    fn variant_id_names_single_chain() {
        let query = Query::variant(
            "/tmp/101M.pdb",
            GraphLevel::Residue,
            "A",
            ResidueLocus::new(27, Some('B')),
            &ALANINE,
            &LYSINE,
        );
        assert_eq!(query.base_id(), "residue-srv:A:101M");
        assert_eq!(query.to_string(), "residue-srv:A:101M (A27BK)");
    }

    #[test]
    fn non_positive_distances_are_rejected() {
        let query = Query::interface("x.pdb", GraphLevel::Residue, "A", "B").with_cutoff(0.0);
        assert_eq!(
            query.validate("q").unwrap_err(),
            ConfigError::NonPositiveDistance {
                query: "q".to_string(),
                parameter: "cutoff",
                value: 0.0,
            }
        );

        let query = Query::variant(
            "x.pdb",
            GraphLevel::Atomic,
            "A",
            ResidueLocus::from(1),
            &ALANINE,
            &LYSINE,
        )
        .with_radius(-1.0);
        assert!(matches!(
            query.validate("q"),
            Err(ConfigError::NonPositiveDistance {
                parameter: "radius",
                ..
            })
        ));
    }

    #[test]
    fn interface_needs_two_distinct_chains() {
        let query = Query::interface("x.pdb", GraphLevel::Residue, "A", "A");
        assert!(matches!(
            query.validate("q"),
            Err(ConfigError::InvalidQuery { .. })
        ));
    }
}
