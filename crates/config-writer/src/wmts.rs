//! Proxy configuration for a WMTS layer.
//!
//! A WMTS layer becomes a tile source in the layer's native grid, a
//! temporary cache in that grid and a served cache that re-tiles into the
//! shared web mercator grid.

use std::collections::BTreeMap;

use capabilities::{Layer, TemplateValues, TileMatrixSet, WmtsCapabilities};
use tracing::info;
use wmtsproxy_common::{ProxyError, ProxyResult};

use crate::grid::{derive_grid, Grid};
use crate::mapproxy::{
    CacheConfig, Coverage, GridConfig, LayerConfig, MapProxyConfig, OnError, SourceConfig,
    LAYER_NAME, RESERVED_GRID_NAMES, WEBMERCATOR_GRID,
};
use crate::{source_name, CacheNames};

/// Upstream status codes answered with a transparent tile.
const BLANK_TILE_STATUS: &[u16] = &[204, 400];

const META_SIZE: [u32; 2] = [6, 6];
const META_BUFFER: u32 = 0;
const CONCURRENT_TILE_CREATORS: u32 = 4;

/// Style used when a layer declares none.
const FALLBACK_STYLE: &str = "default";

/// Layer, matrix set and dimension values chosen by the caller.
#[derive(Debug, Clone, Default)]
pub struct WmtsSelection<'a> {
    pub layer: &'a str,
    /// First declared matrix set when `None`
    pub matrix_set: Option<&'a str>,
    /// Dimension id -> value, overriding the declared defaults
    pub dimensions: BTreeMap<String, String>,
}

/// Add source, caches, grid and layer for a WMTS layer to `config`.
///
/// `config` is left untouched when an error is returned.
pub fn add_wmts_layer(
    config: &mut MapProxyConfig,
    caps: &WmtsCapabilities,
    service_name: &str,
    selection: &WmtsSelection<'_>,
    timestamp: f64,
) -> ProxyResult<()> {
    if selection.layer.is_empty() {
        return Err(ProxyError::config_writer("No layer given"));
    }
    let layer = caps.layer(selection.layer)?.ok_or_else(|| {
        ProxyError::config_writer(format!("Layer \"{}\" not found", selection.layer))
    })?;
    let template = layer.url_template.as_ref().ok_or_else(|| {
        ProxyError::config_writer(format!("Layer \"{}\" has no requestable url", layer.id))
    })?;
    let matrix_set = select_matrix_set(layer, selection.matrix_set)?;
    let format = layer.formats.first().ok_or_else(|| {
        ProxyError::config_writer(format!("Layer \"{}\" has no format", layer.id))
    })?;

    let mut grid = derive_grid(matrix_set).map_err(|e| {
        ProxyError::feature(format!("Tile matrix \"{}\" not supported", matrix_set.id))
            .with_cause(e)
    })?;
    if RESERVED_GRID_NAMES.contains(&grid.name.as_str()) {
        grid.name.push('_');
    }

    let values = TemplateValues {
        layer: &layer.id,
        tile_matrix_set: &matrix_set.id,
        format,
        style: style_id(layer),
        dimensions: dimension_values(layer, &selection.dimensions),
        tile_matrix_prefix: grid.prefix.as_deref(),
    };
    let url = template.render(&values);

    let coverage = grid.srs.transform_bbox_to_wgs84(&grid.bbox).clip_to(&layer.bbox);
    let on_error = BLANK_TILE_STATUS
        .iter()
        .map(|status| (*status, OnError::transparent()))
        .collect();

    let source = source_name(&layer.id);
    let names = CacheNames::new(service_name, timestamp);

    config
        .grids
        .entry(grid.name.clone())
        .or_insert_with(|| grid_config(&grid));
    config.sources.insert(
        source.clone(),
        SourceConfig::Tile {
            coverage: Coverage {
                bbox: coverage.to_array(),
                srs: "EPSG:4326".to_string(),
            },
            grid: grid.name.clone(),
            on_error,
            url,
        },
    );
    config.caches.insert(
        names.tmpcache().to_string(),
        CacheConfig::simple(grid.name.clone(), source),
    );
    config.caches.insert(
        names.cache().to_string(),
        CacheConfig {
            concurrent_tile_creators: Some(CONCURRENT_TILE_CREATORS),
            meta_buffer: Some(META_BUFFER),
            meta_size: Some(META_SIZE),
            ..CacheConfig::simple(WEBMERCATOR_GRID, names.tmpcache())
        },
    );
    config.layers.push(LayerConfig {
        name: LAYER_NAME.to_string(),
        sources: vec![names.cache().to_string()],
        title: layer.title.clone().unwrap_or_else(|| layer.id.clone()),
    });

    info!(
        service = %service_name,
        layer = %layer.id,
        matrix_set = %matrix_set.id,
        grid = %grid.name,
        "Added WMTS layer to configuration"
    );
    Ok(())
}

fn select_matrix_set<'l>(layer: &'l Layer, requested: Option<&str>) -> ProxyResult<&'l TileMatrixSet> {
    let first = layer.matrix_sets.first().ok_or_else(|| {
        ProxyError::config_writer(format!("Layer \"{}\" has no matrix set", layer.id))
    })?;

    match requested {
        None => Ok(&**first),
        Some(id) => layer.matrix_set(id).map(|ms| &**ms).ok_or_else(|| {
            ProxyError::config_writer(format!(
                "Matrix set \"{}\" not supported by layer \"{}\"",
                id, layer.id
            ))
        }),
    }
}

fn style_id(layer: &Layer) -> &str {
    layer
        .default_style()
        .or_else(|| layer.styles.first())
        .map(|s| s.id.as_str())
        .unwrap_or(FALLBACK_STYLE)
}

/// Override value, else declared default, else empty, for every dimension.
fn dimension_values(layer: &Layer, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    layer
        .dimensions
        .iter()
        .map(|dim| {
            let value = overrides
                .get(&dim.id)
                .or(dim.default.as_ref())
                .cloned()
                .unwrap_or_default();
            (dim.id.clone(), value)
        })
        .collect()
}

fn grid_config(grid: &Grid) -> GridConfig {
    GridConfig::Custom {
        bbox: grid.bbox.to_array(),
        origin: "nw".to_string(),
        res: grid.resolutions.clone(),
        srs: grid.srs.srs_code(),
        tile_size: [grid.tile_size.0, grid.tile_size.1],
    }
}
