use gnnprep::core::graph::GraphLevel;
use gnnprep::engine::config::DEFAULT_OUTPUT_PREFIX;
use gnnprep::engine::deadline::DEFAULT_QUERY_TIMEOUT;
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub output_prefix: PathBuf,
    pub combine_output: bool,
    pub query_timeout_secs: u64,
    pub level: GraphLevel,
    pub warn_duplicates: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_prefix: PathBuf::from(DEFAULT_OUTPUT_PREFIX),
            combine_output: true,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
            level: GraphLevel::Residue,
            warn_duplicates: true,
        }
    }
}
