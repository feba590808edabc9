//! GET /configs and /configs/:id - generated proxy configurations.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::common::{error_response, respond};
use crate::service;
use crate::state::AppState;

const CONFIG_COUNTER: &str = "wmtsproxy_config_requests_total";

#[derive(Debug, Serialize)]
pub struct ConfigList {
    pub configs: Vec<String>,
}

/// Ids of all available configurations.
pub async fn configs_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let result = service::available_configs(&state)
        .await
        .map(|configs| ConfigList { configs });
    respond(CONFIG_COUNTER, result, None)
}

/// YAML configuration of one registration, generated on first request.
pub async fn config_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = id.strip_suffix(".yaml").unwrap_or(&id);
    match service::config_yaml(&state, id).await {
        Ok(yaml) => {
            metrics::counter!(CONFIG_COUNTER, "outcome" => "success").increment(1);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/x-yaml"))],
                yaml,
            )
                .into_response()
        }
        Err(err) => {
            metrics::counter!(CONFIG_COUNTER, "outcome" => err.kind()).increment(1);
            error_response(&err, None)
        }
    }
}
