//! GET /check - layers of a capabilities document.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use super::common::{required, respond};
use crate::service;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckParams {
    pub url: Option<String>,
    pub callback: Option<String>,
}

#[instrument(skip(state))]
pub async fn check_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> Response {
    let result = match required(&params.url, "url") {
        Ok(url) => service::check(&state, url).await,
        Err(e) => Err(e),
    };
    respond("wmtsproxy_check_requests_total", result, params.callback.as_deref())
}
