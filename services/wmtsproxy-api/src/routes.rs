//! Router construction.

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// All service routes with shared state and HTTP layers.
pub fn router(state: Arc<AppState>, prometheus: PrometheusHandle) -> Router {
    Router::new()
        .route("/check", get(handlers::check_handler))
        .route("/add", get(handlers::add_handler))
        .route("/configs", get(handlers::configs_handler))
        .route("/configs/:id", get(handlers::config_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(Extension(prometheus))
        .layer(CatchPanicLayer::custom(handlers::common::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
