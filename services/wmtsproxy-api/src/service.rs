//! Request pipeline: fetch, parse, validate, register and synthesize.
//!
//! Every stage failure aborts the operation. Nothing is stored unless the
//! selection was validated against the fetched document.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use capabilities::{
    parse_capabilities, parse_wms_capabilities, ResolutionHint, WmsCapabilities, WmtsCapabilities,
};
use config_writer::{add_wms_layer, add_wmts_layer, write_config, MapProxyConfig, WmtsSelection};
use projection::{is_supported_srs, mercator};
use registry::{CapabilitiesType, RegistrationRecord, RegistrationStore};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use wmtsproxy_common::{sanitize_identifier, ProxyError, ProxyResult};

use crate::state::AppState;

/// Levels of the served web mercator grid.
pub const WEBMERCATOR_LEVELS: usize = 20;

/// SRS moved to the front of WMS SRS lists, most preferred first.
const PREFERRED_SRS: &[&str] = &["EPSG:3857", "EPSG:900913", "EPSG:4326"];

const INVALID_DOCUMENT: &str = "not a valid capabilities document";

// ============================================================================
// Check summaries
// ============================================================================

/// Description of the layers in a capabilities document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckSummary {
    Wmts {
        title: Option<String>,
        layers: Vec<WmtsLayerSummary>,
    },
    Wms {
        title: Option<String>,
        layers: Vec<WmsLayerSummary>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WmtsLayerSummary {
    pub name: String,
    pub title: Option<String>,
    pub matrix_sets: Vec<String>,
    pub llbbox: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<BTreeMap<String, DimensionSummary>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub value: Option<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WmsLayerSummary {
    pub name: String,
    pub title: Option<String>,
    pub srs: Vec<String>,
    pub llbbox: Option<[f64; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_level: Option<usize>,
}

/// Fetch a document, bounded by the configured timeout.
#[instrument(skip(state))]
pub async fn fetch_document(state: &AppState, url: &str) -> ProxyResult<Bytes> {
    match tokio::time::timeout(state.config.fetch_timeout, state.fetcher.fetch(url)).await {
        Ok(result) => result,
        Err(_) => Err(ProxyError::capabilities("Opening given capabilities url failed.")
            .with_cause(format!(
                "no response within {}s",
                state.config.fetch_timeout.as_secs_f64()
            ))),
    }
}

/// Summarize the document at `url`, trying WMTS before WMS.
pub async fn check(state: &AppState, url: &str) -> ProxyResult<CheckSummary> {
    let bytes = fetch_document(state, url).await?;

    match parse_capabilities(&bytes) {
        Ok(doc) => wmts_summary(&doc),
        Err(wmts_err) => {
            debug!(error = %wmts_err.system_msg(), "Not a WMTS document, trying WMS");
            let doc = parse_wms_capabilities(&bytes)
                .map_err(|e| ProxyError::capabilities(INVALID_DOCUMENT).with_cause(e.system_msg()))?;
            Ok(wms_summary(&doc))
        }
    }
}

pub fn wmts_summary(doc: &WmtsCapabilities) -> ProxyResult<CheckSummary> {
    let layers = doc
        .layers()?
        .values()
        .map(|layer| {
            let dimensions: BTreeMap<String, DimensionSummary> = layer
                .dimensions
                .iter()
                .map(|dim| {
                    (
                        dim.id.clone(),
                        DimensionSummary {
                            value: dim.value.clone(),
                            default: dim.default.clone(),
                        },
                    )
                })
                .collect();

            WmtsLayerSummary {
                name: layer.id.clone(),
                title: layer.title.clone(),
                matrix_sets: layer.matrix_set_ids(),
                llbbox: layer.bbox.to_array(),
                dimensions: (!dimensions.is_empty()).then_some(dimensions),
            }
        })
        .collect();

    Ok(CheckSummary::Wmts {
        title: doc.service().title.clone(),
        layers,
    })
}

pub fn wms_summary(doc: &WmsCapabilities) -> CheckSummary {
    let layers = doc
        .layers
        .iter()
        .map(|layer| {
            let (min_level, max_level) = layer.res_hint.map(levels).unwrap_or((None, None));
            WmsLayerSummary {
                name: layer.name.clone(),
                title: layer.title.clone(),
                srs: sorted_srs_list(&layer.srs)
                    .into_iter()
                    .filter(|srs| is_supported_srs(srs))
                    .collect(),
                llbbox: layer.llbbox.map(|b| b.to_array()),
                min_level,
                max_level,
            }
        })
        .collect();

    CheckSummary::Wms {
        title: doc.title.clone(),
        layers,
    }
}

/// Zoom levels of the served grid matching a resolution hint.
///
/// The coarsest resolution gives the lowest level.
fn levels(hint: ResolutionHint) -> (Option<usize>, Option<usize>) {
    let level = |res: f64| mercator::closest_level(res, WEBMERCATOR_LEVELS);
    (hint.max_res.map(level), hint.min_res.map(level))
}

/// Move EPSG:3857, EPSG:900913 and EPSG:4326 to the front.
///
/// The order of all other codes is kept.
pub fn sorted_srs_list(srs: &[String]) -> Vec<String> {
    let mut result: Vec<String> = PREFERRED_SRS
        .iter()
        .filter(|preferred| srs.iter().any(|s| s == *preferred))
        .map(|s| s.to_string())
        .collect();
    result.extend(
        srs.iter()
            .filter(|s| !PREFERRED_SRS.contains(&s.as_str()))
            .cloned(),
    );
    result
}

// ============================================================================
// Registration
// ============================================================================

/// Register a WMTS layer and return the registration id.
#[instrument(skip(state, dimensions))]
pub async fn add_wmts(
    state: &AppState,
    url: &str,
    layer_name: &str,
    matrix_set: &str,
    dimensions: BTreeMap<String, String>,
) -> ProxyResult<String> {
    let bytes = fetch_document(state, url).await?;
    let doc = parse_capabilities(&bytes)?;

    let layer = doc.layer(layer_name)?.ok_or_else(|| {
        ProxyError::user(format!(
            "Layer \"{}\" not found in given capabilities document",
            layer_name
        ))
    })?;
    if layer.matrix_set(matrix_set).is_none() {
        return Err(ProxyError::user(format!(
            "MatrixSet \"{}\" not supported by layer \"{}\"",
            matrix_set, layer_name
        )));
    }

    let record = RegistrationRecord::new(CapabilitiesType::Wmts, url, layer_name, matrix_set, dimensions)?;
    store_record(Arc::clone(&state.store), record).await
}

/// Register a WMS layer and return the registration id.
#[instrument(skip(state))]
pub async fn add_wms(state: &AppState, url: &str, layer_name: &str, srs: &str) -> ProxyResult<String> {
    let bytes = fetch_document(state, url).await?;
    let doc = parse_wms_capabilities(&bytes)?;

    let layer = doc.layer(layer_name).ok_or_else(|| {
        ProxyError::user(format!(
            "Layer \"{}\" not found in given capabilities document",
            layer_name
        ))
    })?;
    if !layer.supports_srs(srs) {
        return Err(ProxyError::user(format!(
            "SRS \"{}\" not supported by layer \"{}\"",
            srs, layer_name
        )));
    }
    if !is_supported_srs(srs) {
        return Err(ProxyError::feature(format!("Unsupported SRS \"{}\"", srs)));
    }

    let record = RegistrationRecord::new(CapabilitiesType::Wms, url, layer_name, srs, BTreeMap::new())?;
    store_record(Arc::clone(&state.store), record).await
}

async fn store_record(store: Arc<dyn RegistrationStore>, record: RegistrationRecord) -> ProxyResult<String> {
    run_blocking("Creating layer failed", move || {
        store
            .put(&record)
            .map(|_| record.id)
            .map_err(|e| ProxyError::service("Creating layer failed").with_cause(e))
    })
    .await
}

/// Run store and filesystem work on the blocking pool.
///
/// A panicking closure is reported as a service error with `context`.
async fn run_blocking<T, F>(context: &'static str, f: F) -> ProxyResult<T>
where
    F: FnOnce() -> ProxyResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProxyError::service(context).with_cause(e))?
}

// ============================================================================
// Configurations
// ============================================================================

/// Registration ids and stored configurations, sorted and de-duplicated.
pub async fn available_configs(state: &AppState) -> ProxyResult<Vec<String>> {
    let store = Arc::clone(&state.store);
    let dir = state.config.configs_dir.clone();
    run_blocking("Listing configurations failed", move || {
        let mut ids: BTreeSet<String> = store.ids()?.into_iter().collect();
        ids.extend(stored_config_ids(&dir)?);
        Ok(ids.into_iter().collect())
    })
    .await
}

fn stored_config_ids(dir: &Path) -> ProxyResult<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ProxyError::service("Listing configurations failed")
                .with_cause(format!("{}: {}", dir.display(), e)))
        }
    };

    Ok(entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "yaml"))
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect())
}

/// YAML configuration for a registration.
///
/// Generated from the registration on first use and stored in the
/// configurations directory, later requests reuse the stored file.
#[instrument(skip(state))]
pub async fn config_yaml(state: &AppState, id: &str) -> ProxyResult<String> {
    if id.is_empty() || sanitize_identifier(id) != id {
        return Err(ProxyError::user(format!("Invalid configuration id \"{}\"", id)));
    }

    let path = state.config.config_path(id);
    match tokio::fs::read_to_string(&path).await {
        Ok(yaml) => {
            debug!(id, "Using stored configuration");
            return Ok(yaml);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(id, error = %e, "Stored configuration unreadable, regenerating"),
    }

    let store = Arc::clone(&state.store);
    let lookup = id.to_string();
    let record = run_blocking("Loading configuration failed", move || {
        store.get(&lookup).map_err(ProxyError::from)
    })
    .await?;

    let config = synthesize(state, &record).await?;
    let target = path.clone();
    let yaml = run_blocking("Writing configuration failed", move || write_config(&config, &target)).await?;
    info!(id, path = %path.display(), "Generated configuration");
    Ok(yaml)
}

/// Build the full configuration for a registration.
pub async fn synthesize(state: &AppState, record: &RegistrationRecord) -> ProxyResult<MapProxyConfig> {
    let bytes = fetch_document(state, &record.url).await?;
    let mut config = MapProxyConfig::new(state.config.base_config.clone());

    match record.kind {
        CapabilitiesType::Wms => {
            let doc = parse_wms_capabilities(&bytes)
                .map_err(|e| ProxyError::capabilities(INVALID_DOCUMENT).with_cause(e.system_msg()))?;
            add_wms_layer(
                &mut config,
                &doc,
                &record.id,
                &record.layer_name,
                Some(record.system_id.as_str()),
                record.timestamp,
            )?;
        }
        CapabilitiesType::Wmts => {
            let doc = parse_capabilities(&bytes)
                .map_err(|e| ProxyError::capabilities(INVALID_DOCUMENT).with_cause(e.system_msg()))?;
            let selection = WmtsSelection {
                layer: &record.layer_name,
                matrix_set: Some(record.system_id.as_str()),
                dimensions: record.dimensions.clone(),
            };
            add_wmts_layer(&mut config, &doc, &record.id, &selection, record.timestamp)?;
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sorted_srs_list() {
        assert_eq!(
            sorted_srs_list(&codes(&["EPSG:31287", "EPSG:4326", "EPSG:25833", "EPSG:3857"])),
            codes(&["EPSG:3857", "EPSG:4326", "EPSG:31287", "EPSG:25833"])
        );
        assert_eq!(
            sorted_srs_list(&codes(&["EPSG:4326", "EPSG:900913", "EPSG:3857"])),
            codes(&["EPSG:3857", "EPSG:900913", "EPSG:4326"])
        );
        assert!(sorted_srs_list(&[]).is_empty());
    }

    #[test]
    fn test_levels_from_resolution_hint() {
        let res = mercator::global_resolutions(WEBMERCATOR_LEVELS);
        let hint = ResolutionHint {
            min_res: Some(res[15]),
            max_res: Some(res[3]),
        };
        assert_eq!(levels(hint), (Some(3), Some(15)));
        assert_eq!(
            levels(ResolutionHint {
                min_res: None,
                max_res: Some(res[7])
            }),
            (Some(7), None)
        );
    }
}
