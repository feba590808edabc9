//! Proxy configuration for a WMS layer.

use capabilities::{WmsCapabilities, WmsLayer};
use projection::is_supported_srs;
use tracing::info;
use wmtsproxy_common::{ProxyError, ProxyResult};

use crate::mapproxy::{
    CacheConfig, Coverage, LayerConfig, MapProxyConfig, SourceConfig, WmsRequest, LAYER_NAME,
    WEBMERCATOR_GRID,
};
use crate::{source_name, CacheNames};

/// Add source, cache and layer for a WMS layer to `config`.
///
/// Without `srs` the source supports every SRS the layer offers. `config` is
/// left untouched when an error is returned.
pub fn add_wms_layer(
    config: &mut MapProxyConfig,
    caps: &WmsCapabilities,
    service_name: &str,
    layer_name: &str,
    srs: Option<&str>,
    timestamp: f64,
) -> ProxyResult<()> {
    if layer_name.is_empty() {
        return Err(ProxyError::config_writer("No layer given"));
    }
    let layer = caps
        .layer(layer_name)
        .ok_or_else(|| ProxyError::config_writer(format!("Layer \"{}\" not found", layer_name)))?;

    let supported_srs = match srs {
        Some(code) if !layer.supports_srs(code) => {
            return Err(ProxyError::config_writer(format!(
                "Given srs \"{}\" doesn't exist for layer \"{}\"",
                code, layer_name
            )))
        }
        Some(code) => vec![code.to_string()],
        None => layer.srs.clone(),
    };
    if let Some(code) = supported_srs.iter().find(|code| !is_supported_srs(code)) {
        return Err(ProxyError::feature(format!("Unsupported SRS \"{}\"", code)));
    }

    let source = source_name(&layer.name);
    let names = CacheNames::new(service_name, timestamp);

    config.sources.insert(
        source.clone(),
        SourceConfig::Wms {
            coverage: coverage(layer, &supported_srs),
            req: WmsRequest {
                layers: layer.name.clone(),
                transparent: !layer.opaque,
                url: layer.url.clone(),
            },
            supported_srs,
        },
    );
    config.caches.insert(
        names.cache().to_string(),
        CacheConfig::simple(WEBMERCATOR_GRID, source),
    );
    config.layers.push(LayerConfig {
        name: LAYER_NAME.to_string(),
        sources: vec![names.cache().to_string()],
        title: layer.title.clone().unwrap_or_else(|| layer.name.clone()),
    });

    info!(
        service = %service_name,
        layer = %layer.name,
        "Added WMS layer to configuration"
    );
    Ok(())
}

/// Coverage of the source.
///
/// Prefers the bbox declared for a single requested SRS, then the WGS84
/// bbox, then any declared bbox.
fn coverage(layer: &WmsLayer, srs: &[String]) -> Option<Coverage> {
    if let [code] = srs {
        if let Some(bbox) = layer.bbox_for(code) {
            return Some(Coverage {
                bbox: bbox.to_array(),
                srs: code.clone(),
            });
        }
    }
    if let Some(bbox) = &layer.llbbox {
        return Some(Coverage {
            bbox: bbox.to_array(),
            srs: "EPSG:4326".to_string(),
        });
    }
    layer.bbox_srs.first().map(|(code, bbox)| Coverage {
        bbox: bbox.to_array(),
        srs: code.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmtsproxy_common::BoundingBox;

    fn layer() -> WmsLayer {
        WmsLayer {
            name: "roads".to_string(),
            title: None,
            srs: vec!["EPSG:3857".to_string(), "EPSG:25833".to_string()],
            llbbox: None,
            bbox_srs: Vec::new(),
            opaque: false,
            url: "http://wms.example.org/service?".to_string(),
            res_hint: None,
        }
    }

    #[test]
    fn test_coverage_without_extent() {
        assert_eq!(coverage(&layer(), &["EPSG:3857".to_string()]), None);
    }

    #[test]
    fn test_coverage_falls_back_to_any_declared_bbox() {
        let mut l = layer();
        l.bbox_srs
            .push(("EPSG:25833".to_string(), BoundingBox::new(1.0, 2.0, 3.0, 4.0)));

        let cov = coverage(&l, &["EPSG:3857".to_string()]).unwrap();
        assert_eq!(cov.srs, "EPSG:25833");
        assert_eq!(cov.bbox, [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_coverage_prefers_wgs84_over_other_srs() {
        let mut l = layer();
        l.bbox_srs
            .push(("EPSG:25833".to_string(), BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
        l.llbbox = Some(BoundingBox::new(9.0, 46.0, 17.0, 49.0));

        let all: Vec<String> = l.srs.clone();
        let cov = coverage(&l, &all).unwrap();
        assert_eq!(cov.srs, "EPSG:4326");

        let cov = coverage(&l, &["EPSG:25833".to_string()]).unwrap();
        assert_eq!(cov.srs, "EPSG:25833");
    }
}
