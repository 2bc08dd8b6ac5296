use super::deadline::DEFAULT_QUERY_TIMEOUT;
use super::features::{FeaturePlan, FeatureSelection};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Output prefix used when none is configured.
pub const DEFAULT_OUTPUT_PREFIX: &str = "processed-queries";

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Unknown feature module: '{0}'")]
    UnknownFeatureModule(String),
    #[error("Worker count must be at least 1")]
    ZeroWorkers,
    #[error("Query timeout must be greater than zero")]
    ZeroTimeout,
    #[error("Output prefix must not be empty")]
    EmptyOutputPrefix,
    #[error("Query '{query}': {parameter} must be a positive distance, got {value}")]
    NonPositiveDistance {
        query: String,
        parameter: &'static str,
        value: f64,
    },
    #[error("Query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },
}

/// Settings of one processing run over a query collection.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Output files are named `<prefix>-<worker>.gnn`, or `<prefix>.gnn` once combined.
    pub output_prefix: PathBuf,
    pub worker_count: usize,
    pub combine_output: bool,
    /// Budget for the feature stage of each query.
    pub query_timeout: Duration,
    /// The resolved feature modules, in run order.
    pub plan: FeaturePlan,
}

#[derive(Default)]
pub struct ProcessConfigBuilder {
    output_prefix: Option<PathBuf>,
    worker_count: Option<usize>,
    combine_output: Option<bool>,
    query_timeout: Option<Duration>,
    features: Option<FeatureSelection>,
}

impl ProcessConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }
    pub fn combine_output(mut self, combine: bool) -> Self {
        self.combine_output = Some(combine);
        self
    }
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
    pub fn features(mut self, selection: impl Into<FeatureSelection>) -> Self {
        self.features = Some(selection.into());
        self
    }

    /// Validates every parameter and resolves the feature selection.
    ///
    /// Unset parameters take their defaults: prefix `processed-queries`, one worker per
    /// available CPU, combined output, a 20 second query timeout and the default modules.
    pub fn build(self) -> Result<ProcessConfig, ConfigError> {
        let output_prefix = self
            .output_prefix
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PREFIX));
        if output_prefix.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputPrefix);
        }

        let worker_count = self.worker_count.unwrap_or_else(default_worker_count);
        if worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }

        let query_timeout = self.query_timeout.unwrap_or(DEFAULT_QUERY_TIMEOUT);
        if query_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let plan = self.features.unwrap_or_default().resolve()?;

        Ok(ProcessConfig {
            output_prefix,
            worker_count,
            combine_output: self.combine_output.unwrap_or(true),
            query_timeout,
            plan,
        })
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
