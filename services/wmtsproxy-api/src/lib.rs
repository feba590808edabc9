//! Capabilities registration service.
//!
//! Inspects WMS/WMTS capabilities documents, registers selected layers and
//! generates tile-caching proxy configurations for them on demand.

pub mod config;
pub mod fetch;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

pub use config::ServiceConfig;
pub use fetch::{CapabilitiesFetcher, HttpFetcher};
pub use routes::router;
pub use state::AppState;
