//! Runtime settings of the service.

use std::path::PathBuf;
use std::time::Duration;

/// Paths and limits used by the request pipeline.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// CSV file holding the registrations
    pub records_file: PathBuf,
    /// Directory for generated YAML configurations
    pub configs_dir: PathBuf,
    /// Written as `base:` into every generated configuration
    pub base_config: String,
    /// Deadline for fetching a capabilities document
    pub fetch_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            records_file: PathBuf::from("./services.csv"),
            configs_dir: PathBuf::from("./configs"),
            base_config: "base.yaml".to_string(),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl ServiceConfig {
    /// File of a generated configuration.
    pub fn config_path(&self, id: &str) -> PathBuf {
        self.configs_dir.join(format!("{}.yaml", id))
    }
}
