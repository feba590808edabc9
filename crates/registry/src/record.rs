//! Registration records and their identifiers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;
use wmtsproxy_common::{sanitize_identifier, ProxyError, ProxyResult};

/// Kind of capabilities document a registration points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilitiesType {
    Wms,
    Wmts,
}

impl CapabilitiesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilitiesType::Wms => "wms",
            CapabilitiesType::Wmts => "wmts",
        }
    }
}

impl fmt::Display for CapabilitiesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilitiesType {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wms" => Ok(CapabilitiesType::Wms),
            "wmts" => Ok(CapabilitiesType::Wmts),
            _ => Err(ProxyError::user("No valid capabilities type given")),
        }
    }
}

/// One registered layer.
///
/// `system_id` is the SRS for WMS and the tile matrix set for WMTS.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRecord {
    pub id: String,
    pub kind: CapabilitiesType,
    pub url: String,
    pub layer_name: String,
    pub system_id: String,
    pub dimensions: BTreeMap<String, String>,
    /// Seconds since the epoch, 0 when unknown
    pub timestamp: f64,
}

impl RegistrationRecord {
    /// New record stamped with the current time.
    pub fn new(
        kind: CapabilitiesType,
        url: &str,
        layer_name: &str,
        system_id: &str,
        dimensions: BTreeMap<String, String>,
    ) -> ProxyResult<Self> {
        let id = derive_id(url, layer_name, system_id, &dimensions)?;
        Ok(Self {
            id,
            kind,
            url: url.to_string(),
            layer_name: layer_name.to_string(),
            system_id: system_id.to_string(),
            dimensions,
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        })
    }
}

/// Identifier of a registration.
///
/// Built from the URL's authority as written, layer, system id and serialized
/// dimensions, with every character outside `[A-Za-z0-9-_]` replaced.
pub fn derive_id(
    url: &str,
    layer_name: &str,
    system_id: &str,
    dimensions: &BTreeMap<String, String>,
) -> ProxyResult<String> {
    Url::parse(url)
        .map_err(|e| ProxyError::user(format!("Invalid capabilities url \"{}\"", url)).with_cause(e))?;

    let mut id = format!("{}_{}_{}", authority(url), layer_name, system_id);
    let dims = serialize_dimensions(dimensions);
    if !dims.is_empty() {
        id.push('_');
        id.push_str(&dims);
    }
    Ok(sanitize_identifier(&id))
}

/// Authority of `url` exactly as written.
///
/// Case and default ports are kept, ids of existing records depend on them.
fn authority(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// `k=v,k=v` with keys sorted, empty for no dimensions.
pub fn serialize_dimensions(dimensions: &BTreeMap<String, String>) -> String {
    dimensions
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`serialize_dimensions`].
///
/// Values may contain `=`. Entries without one are ignored.
pub fn unserialize_dimensions(dimensions: &str) -> BTreeMap<String, String> {
    dimensions
        .split(',')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
