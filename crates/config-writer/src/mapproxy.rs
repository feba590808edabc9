//! Configuration schema of the downstream tile-caching proxy.
//!
//! Key names and nesting are consumed by MapProxy as-is. Struct fields are
//! declared in alphabetical order so serialized documents list keys sorted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cache backend written into every cache entry.
pub const DEFAULT_CACHE_TYPE: &str = "file";

/// Name of the served grid shared by all generated caches.
pub const WEBMERCATOR_GRID: &str = "webmercator";

/// Built-in grid the served grid is based on.
pub const GLOBAL_WEBMERCATOR: &str = "GLOBAL_WEBMERCATOR";

/// Grid names the proxy defines itself.
pub const RESERVED_GRID_NAMES: &[&str] = &["GLOBAL_GEODETIC", "GLOBAL_MERCATOR", GLOBAL_WEBMERCATOR];

/// Name of the single layer every generated configuration serves.
pub const LAYER_NAME: &str = "map";

/// A full proxy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapProxyConfig {
    pub base: Vec<String>,
    pub caches: BTreeMap<String, CacheConfig>,
    pub globals: BTreeMap<String, serde_yaml::Value>,
    pub grids: BTreeMap<String, GridConfig>,
    pub layers: Vec<LayerConfig>,
    pub services: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
    pub sources: BTreeMap<String, SourceConfig>,
}

impl MapProxyConfig {
    /// Empty configuration with a WMTS service and the served grid.
    pub fn new(base_config: impl Into<String>) -> Self {
        let mut services = BTreeMap::new();
        services.insert("wmts".to_string(), BTreeMap::new());

        let mut grids = BTreeMap::new();
        grids.insert(
            WEBMERCATOR_GRID.to_string(),
            GridConfig::Base {
                base: GLOBAL_WEBMERCATOR.to_string(),
            },
        );

        Self {
            base: vec![base_config.into()],
            caches: BTreeMap::new(),
            globals: BTreeMap::new(),
            grids,
            layers: Vec::new(),
            services,
            sources: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridConfig {
    /// Alias of a built-in grid
    Base { base: String },
    Custom {
        bbox: [f64; 4],
        origin: String,
        res: Vec<f64>,
        srs: String,
        tile_size: [u32; 2],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub bbox: [f64; 4],
    pub srs: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnError {
    pub cache: bool,
    pub response: String,
}

impl OnError {
    /// Answer with a transparent tile and do not cache it.
    pub fn transparent() -> Self {
        Self {
            cache: false,
            response: "transparent".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsRequest {
    pub layers: String,
    pub transparent: bool,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Tile {
        coverage: Coverage,
        grid: String,
        on_error: BTreeMap<u16, OnError>,
        url: String,
    },
    Wms {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coverage: Option<Coverage>,
        req: WmsRequest,
        supported_srs: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheBackend {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for CacheBackend {
    fn default() -> Self {
        Self {
            kind: DEFAULT_CACHE_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub cache: CacheBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_tile_creators: Option<u32>,
    pub grids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_buffer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_size: Option<[u32; 2]>,
    pub sources: Vec<String>,
}

impl CacheConfig {
    /// File cache in `grid` fed by `source`.
    pub fn simple(grid: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            cache: CacheBackend::default(),
            concurrent_tile_creators: None,
            grids: vec![grid.into()],
            meta_buffer: None,
            meta_size: None,
            sources: vec![source.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub sources: Vec<String>,
    pub title: String,
}
