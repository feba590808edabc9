//! Configuration synthesis for the downstream tile-caching proxy (MapProxy).
//!
//! - [`grid`] derives a tile grid from a WMTS tile matrix set
//! - [`mapproxy`] is the configuration schema
//! - [`wmts`] and [`wms`] add a selected layer to a configuration
//! - [`writer`] serializes and stores configurations as YAML

pub mod grid;
pub mod mapproxy;
pub mod wms;
pub mod wmts;
pub mod writer;

pub use grid::{crs_to_srs, derive_grid, Grid, TileMatrixError};
pub use mapproxy::MapProxyConfig;
pub use wms::add_wms_layer;
pub use wmts::{add_wmts_layer, WmtsSelection};
pub use writer::{to_yaml, write_config};

/// Suffixes of the cache names generated for one registration.
///
/// A non-zero registration timestamp is embedded so re-registrations with
/// different parameters get fresh cache names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    cache: String,
    tmpcache: String,
}

impl CacheNames {
    pub fn new(service_name: &str, timestamp: f64) -> Self {
        let base = wmtsproxy_common::mangle_name(service_name);
        if timestamp != 0.0 && timestamp.is_finite() {
            let ts = timestamp.trunc() as i64;
            Self {
                cache: format!("{}_{}_cache", base, ts),
                tmpcache: format!("{}_{}_tmpcache", base, ts),
            }
        } else {
            Self {
                cache: format!("{}_cache", base),
                tmpcache: format!("{}_tmpcache", base),
            }
        }
    }

    /// Cache served to clients.
    pub fn cache(&self) -> &str {
        &self.cache
    }

    /// Intermediate cache in the native grid of a WMTS source.
    pub fn tmpcache(&self) -> &str {
        &self.tmpcache
    }
}

/// Name of the source generated for a layer.
pub fn source_name(layer_name: &str) -> String {
    format!("{}_source", wmtsproxy_common::mangle_name(layer_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_names() {
        let names = CacheNames::new("host_layer_EPSG:4326", 0.0);
        assert_eq!(names.cache(), "host_layer_EPSG_4326_cache");
        assert_eq!(names.tmpcache(), "host_layer_EPSG_4326_tmpcache");

        let names = CacheNames::new("svc", 1400000000.75);
        assert_eq!(names.cache(), "svc_1400000000_cache");
        assert_eq!(names.tmpcache(), "svc_1400000000_tmpcache");
    }

    #[test]
    fn test_source_name() {
        assert_eq!(source_name("opengeo:geonames"), "opengeo_geonames_source");
    }
}
