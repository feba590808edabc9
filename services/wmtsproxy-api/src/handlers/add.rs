//! GET /add - register a layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::Response,
};
use registry::CapabilitiesType;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use wmtsproxy_common::ProxyResult;

use super::common::{required, respond};
use crate::service;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AddParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    pub layer: Option<String>,
    pub srs: Option<String>,
    pub matrix_set: Option<String>,
    /// Value of the `time` dimension
    pub time: Option<String>,
    pub callback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub mapproxy_id: String,
}

#[instrument(skip(state))]
pub async fn add_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AddParams>,
) -> Response {
    let result = add(&state, &params).await;
    respond("wmtsproxy_add_requests_total", result, params.callback.as_deref())
}

async fn add(state: &AppState, params: &AddParams) -> ProxyResult<AddResponse> {
    let kind: CapabilitiesType = required(&params.kind, "type")?.parse()?;
    let url = required(&params.url, "url")?;
    let layer = required(&params.layer, "layer")?;

    let id = match kind {
        CapabilitiesType::Wms => {
            let srs = required(&params.srs, "srs")?;
            service::add_wms(state, url, layer, srs).await?
        }
        CapabilitiesType::Wmts => {
            let matrix_set = required(&params.matrix_set, "matrix_set")?;
            let mut dimensions = BTreeMap::new();
            if let Some(time) = params.time.as_deref().filter(|t| !t.is_empty()) {
                dimensions.insert("time".to_string(), time.to_string());
            }
            service::add_wmts(state, url, layer, matrix_set, dimensions).await?
        }
    };

    info!(id = %id, kind = %kind, "Registered layer");
    Ok(AddResponse { mapproxy_id: id })
}
