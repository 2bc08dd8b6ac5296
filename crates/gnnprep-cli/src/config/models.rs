use gnnprep::engine::config::ProcessConfig;
use gnnprep::workflows::collection::QueryCollection;

pub struct AppConfig {
    pub collection: QueryCollection,
    pub process: ProcessConfig,
}
