use super::config::ConfigError;
use super::features::FeatureError;
use crate::core::contacts::ContactError;
use crate::core::graph::GraphError;
use crate::core::io::archive::ArchiveError;
use crate::core::io::pdb::StructureReadError;
use crate::core::io::pssm::PssmError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure while running feature modules on one graph.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Feature module '{module}' failed: {source}")]
    Module {
        module: &'static str,
        #[source]
        source: FeatureError,
    },

    #[error("Feature module '{module}' exceeded the {budget:?} query budget")]
    Timeout {
        module: &'static str,
        budget: Duration,
    },

    #[error("Processing was cancelled")]
    Cancelled,
}

impl EngineError {
    pub(crate) fn from_feature(module: &'static str, source: FeatureError) -> Self {
        match source {
            FeatureError::Timeout { budget, .. } => EngineError::Timeout { module, budget },
            FeatureError::Cancelled => EngineError::Cancelled,
            source => EngineError::Module { module, source },
        }
    }
}

/// Failure of a single query. Never aborts the rest of the collection.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to load structure: {0}")]
    Structure(#[from] StructureReadError),

    #[error("Failed to load PSSM for chain '{chain}' from {path:?}: {source}")]
    Pssm {
        chain: String,
        path: PathBuf,
        #[source]
        source: PssmError,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Contact resolution failed: {0}")]
    Contact(#[from] ContactError),

    #[error("Graph construction failed: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to encode graph: {0}")]
    Record(#[from] ArchiveError),
}

impl QueryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            QueryError::Structure(_) | QueryError::Pssm { .. } => FailureKind::Input,
            QueryError::InvalidQuery(_) => FailureKind::InvalidQuery,
            QueryError::Contact(_) => FailureKind::Reconciliation,
            QueryError::Graph(_) | QueryError::Record(_) => FailureKind::Internal,
            QueryError::Engine(EngineError::Timeout { .. }) => FailureKind::Timeout,
            QueryError::Engine(EngineError::Cancelled) => FailureKind::Cancelled,
            QueryError::Engine(EngineError::Module { .. }) => FailureKind::Feature,
        }
    }
}

/// Coarse classification of a query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Input,
    InvalidQuery,
    Reconciliation,
    Feature,
    Timeout,
    Cancelled,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Input => "input",
            FailureKind::InvalidQuery => "invalid-query",
            FailureKind::Reconciliation => "reconciliation",
            FailureKind::Feature => "feature",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A query that produced no record, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub id: String,
    pub kind: FailureKind,
    pub message: String,
}

impl QueryFailure {
    pub fn new(id: &str, error: &QueryError) -> Self {
        Self {
            id: id.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Collection-level failure of a processing run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Output archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("Processing was cancelled")]
    Cancelled,
}
