//! Application state and shared resources.

use std::sync::Arc;

use registry::{CsvRecordStore, RegistrationStore};

use crate::config::ServiceConfig;
use crate::fetch::CapabilitiesFetcher;

/// Shared application state.
pub struct AppState {
    pub config: ServiceConfig,
    pub fetcher: Arc<dyn CapabilitiesFetcher>,
    pub store: Arc<dyn RegistrationStore>,
}

impl AppState {
    /// State backed by the CSV store named in `config`.
    pub fn new(config: ServiceConfig, fetcher: Arc<dyn CapabilitiesFetcher>) -> Self {
        let store = Arc::new(CsvRecordStore::new(config.records_file.clone()));
        Self {
            config,
            fetcher,
            store,
        }
    }
}
