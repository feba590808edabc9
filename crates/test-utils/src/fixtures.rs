//! Capabilities documents and request parameters shared by tests.

use crate::paths::find_test_file;

/// File names of the capabilities fixtures in `crates/capabilities/testdata/`.
pub mod capabilities {
    /// GeoWebCache WMTS with KVP GetTile and two matrix sets.
    pub const WMTS_GEOSERVER: &str = "wmts-geoserver.xml";

    /// WMTS with a RESTful ResourceURL and a Time dimension.
    pub const WMTS_NASA: &str = "wmts-nasa.xml";

    /// WMTS using an explicit `wmts:` prefix and a styled ResourceURL.
    pub const WMTS_BASEMAP: &str = "wmts-basemap.xml";

    /// WMS 1.1.1 document.
    pub const WMS_111: &str = "wms-111.xml";

    /// WMS 1.3.0 document.
    pub const WMS_130: &str = "wms-130.xml";
}

/// Well known capabilities URLs used across service tests.
pub mod urls {
    pub const WMTS_GEOSERVER: &str =
        "http://v2.suite.opengeo.org/geoserver/gwc/service/wmts?REQUEST=getcapabilities";
    pub const WMTS_NASA: &str = "https://map1.vis.earthdata.nasa.gov/wmts-geo/wmts.cgi";
    pub const WMTS_BASEMAP: &str = "https://maps.example.at/wmts/1.0.0/WMTSCapabilities.xml";
    pub const WMS: &str = "http://wms.example.org/service?SERVICE=WMS&REQUEST=GetCapabilities";
}

/// Read a fixture document into a string.
///
/// Panics with a readable message if the fixture is missing.
pub fn load_fixture(name: &str) -> String {
    let path = find_test_file(name)
        .unwrap_or_else(|| panic!("fixture '{}' not found in any testdata directory", name));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {:?}: {}", path, e))
}
