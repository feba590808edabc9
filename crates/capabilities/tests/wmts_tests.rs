//! Parsing tests against recorded WMTS capabilities documents.

use capabilities::{parse_capabilities, Placeholder, TopLeftCorner, WmtsCapabilities};
use test_utils::{fixtures::capabilities as fixture, load_fixture};
use wmtsproxy_common::ProxyError;

fn load(name: &str) -> WmtsCapabilities {
    parse_capabilities(load_fixture(name).as_bytes()).expect("fixture parses")
}

// ============================================================================
// GeoWebCache document (KVP only)
// ============================================================================

#[test]
fn test_geoserver_service() {
    let cap = load(fixture::WMTS_GEOSERVER);
    let service = cap.service();

    assert_eq!(service.title.as_deref(), Some("Web Map Tile Service - GeoWebCache"));
    assert_eq!(service.service_type.as_deref(), Some("OGC WMTS"));
    assert_eq!(service.service_type_version.as_deref(), Some("1.0.0"));
    assert_eq!(
        service.provider_name.as_deref(),
        Some("http://v2.suite.opengeo.org/geoserver/gwc/service/wmts")
    );
    assert_eq!(
        service.provider_site.as_deref(),
        Some("http://v2.suite.opengeo.org/geoserver/gwc/service/wmts")
    );
    assert_eq!(service.provider_individual_name.as_deref(), Some("GeoWebCache User"));
}

#[test]
fn test_geoserver_operations() {
    let cap = load(fixture::WMTS_GEOSERVER);
    let operations = cap.operations();

    assert_eq!(operations.len(), 3);
    for key in ["GetCapabilities", "GetTile", "GetFeatureInfo"] {
        assert!(operations.contains_key(key), "missing operation {}", key);
    }

    assert_eq!(operations["GetTile"].len(), 1);
    assert_eq!(
        cap.operation_url("GetTile", "KVP"),
        Some("http://v2.suite.opengeo.org/geoserver/gwc/service/wmts?")
    );
    assert_eq!(cap.operation_url("GetTile", "RESTful"), None);
}

#[test]
fn test_geoserver_tile_matrix_sets() {
    let cap = load(fixture::WMTS_GEOSERVER);
    let matrix_sets = cap.matrix_sets().unwrap();

    assert_eq!(matrix_sets.len(), 3);
    for key in ["EPSG:4326", "EPSG:900913", "GlobalCRS84Scale"] {
        assert!(matrix_sets.contains_key(key), "missing matrix set {}", key);
    }

    let set = &matrix_sets["EPSG:4326"];
    assert_eq!(set.crs, "urn:ogc:def:crs:EPSG::4326");
    assert_eq!(set.tile_matrices.len(), 6);

    let first = &set.tile_matrices[0];
    assert_eq!(first.id, "EPSG:4326:0");
    assert_eq!(first.top_left, TopLeftCorner { x: -180.0, y: 90.0 });
    assert_eq!(first.tile_size, (256, 256));
    assert_eq!(first.grid_size, (2, 1));
    assert_eq!(first.scale_denom, 279541132.0143589);

    let last = &set.tile_matrices[5];
    assert_eq!(last.id, "EPSG:4326:5");
    assert_eq!(last.top_left, first.top_left);
    assert_eq!(last.grid_size, (64, 32));
}

#[test]
fn test_geoserver_mercator_corner_is_easting_first() {
    let cap = load(fixture::WMTS_GEOSERVER);
    let set = &cap.matrix_sets().unwrap()["EPSG:900913"];
    assert_eq!(
        set.tile_matrices[0].top_left,
        TopLeftCorner {
            x: -20037508.34,
            y: 20037508.34
        }
    );
}

#[test]
fn test_geoserver_layers() {
    let cap = load(fixture::WMTS_GEOSERVER);
    let layers = cap.layers().unwrap();

    assert_eq!(layers.len(), 3);
    for key in ["opengeo:geonames", "world", "medford"] {
        assert!(layers.contains_key(key), "missing layer {}", key);
    }

    let world = &layers["world"];
    assert_eq!(world.title.as_deref(), Some("world"));
    assert_eq!(world.bbox.to_array(), [-180.0, -90.0, 180.0, 83.624]);
    assert_eq!(world.formats, vec!["image/png", "image/jpeg"]);
    assert_eq!(
        world.info_formats,
        vec!["text/plain", "text/html", "application/vnd.ogc.gml"]
    );

    assert_eq!(world.matrix_sets.len(), 2);
    assert_eq!(world.matrix_sets[0].crs, "urn:ogc:def:crs:EPSG::4326");
    assert_eq!(world.matrix_set_ids(), vec!["EPSG:4326", "EPSG:900913"]);
    assert!(world.dimensions.is_empty());

    let template = world.url_template.as_ref().expect("KVP template");
    assert_eq!(
        template.to_string(),
        "http://v2.suite.opengeo.org/geoserver/gwc/service/wmts?SERVICE=WMTS&REQUEST=GetTile\
         &VERSION=1.0.0&LAYER=%(layer)s&TILEMATRIXSET=%(tile_matrix_set)s&TILEMATRIX=%(z)s\
         &TILEROW=%(y)s&TILECOL=%(x)s&FORMAT=%(format)s"
    );
}

#[test]
fn test_layers_are_memoized() {
    let cap = load(fixture::WMTS_GEOSERVER);
    let first = cap.layers().unwrap();
    let second = cap.layers().unwrap();
    assert!(std::ptr::eq(first, second));

    // Layers share the parsed matrix set
    let world = &first["world"];
    let medford = &first["medford"];
    assert!(std::sync::Arc::ptr_eq(
        &world.matrix_sets[0],
        &medford.matrix_sets[0]
    ));
}

// ============================================================================
// NASA document (RESTful with time dimension)
// ============================================================================

#[test]
fn test_nasa_layer() {
    let cap = load(fixture::WMTS_NASA);
    let layer = cap.layer("AIRS_CO_Total_Column_Day").unwrap().unwrap();

    assert_eq!(layer.title.as_deref(), Some("AIRS_CO_Total_Column_Day"));

    assert_eq!(layer.styles.len(), 1);
    assert_eq!(layer.styles[0].id, "default");
    assert_eq!(layer.styles[0].title.as_deref(), Some("default"));
    assert!(layer.styles[0].default);
    assert_eq!(layer.default_style().map(|s| s.id.as_str()), Some("default"));

    let template = layer.url_template.as_ref().unwrap();
    assert_eq!(
        template.to_string(),
        "http://map1.vis.earthdata.nasa.gov/wmts-geo/AIRS_CO_Total_Column_Day/default/%(time)s\
         /%(tile_matrix_set)s/%(z)s/%(y)s/%(x)s.png"
    );
    assert!(template
        .placeholders()
        .any(|p| *p == Placeholder::Dimension("time".to_string())));

    assert_eq!(layer.dimensions.len(), 1);
    let dimension = &layer.dimensions[0];
    assert_eq!(dimension.id, "time");
    assert_eq!(dimension.default.as_deref(), Some("2014-03-31"));
    assert_eq!(dimension.current.as_deref(), Some("false"));
    assert_eq!(dimension.value.as_deref(), Some("2012-05-08/2014-03-31/P1D"));
}

#[test]
fn test_nasa_resource_url_prefers_tile_resources() {
    let cap = load(fixture::WMTS_NASA);
    let layer = cap.layer("Coastlines").unwrap().unwrap();
    assert_eq!(
        layer.url_template.as_ref().unwrap().to_string(),
        "http://map1.vis.earthdata.nasa.gov/wmts-geo/Coastlines/default/%(tile_matrix_set)s\
         /%(z)s/%(y)s/%(x)s.png"
    );
}

#[test]
fn test_nasa_first_binding_per_mode_wins() {
    let cap = load(fixture::WMTS_NASA);
    assert_eq!(
        cap.operation_url("GetTile", "KVP"),
        Some("http://map1.vis.earthdata.nasa.gov/wmts-geo/wmts.cgi?")
    );
    assert_eq!(
        cap.operation_url("GetTile", "RESTful"),
        Some("http://map1.vis.earthdata.nasa.gov/wmts-geo/")
    );
}

#[test]
fn test_nasa_crs84_corner() {
    let cap = load(fixture::WMTS_NASA);
    let set = &cap.matrix_sets().unwrap()["EPSG4326_2km"];
    assert_eq!(set.crs, "urn:ogc:def:crs:OGC:1.3:CRS84");
    assert_eq!(set.tile_matrices[0].top_left, TopLeftCorner { x: -180.0, y: 90.0 });
    assert_eq!(set.tile_matrices[0].tile_size, (512, 512));
}

// ============================================================================
// Explicitly prefixed document
// ============================================================================

#[test]
fn test_basemap_service_and_operations() {
    let cap = load(fixture::WMTS_BASEMAP);
    assert_eq!(cap.service().title.as_deref(), Some("Basemap Austria"));
    assert_eq!(cap.service().provider_site.as_deref(), Some("https://www.example.at/gis"));

    let operations = cap.operations();
    assert_eq!(operations.len(), 2);
    assert_eq!(
        cap.operation_url("GetTile", "RESTful"),
        Some("https://maps.example.at/basemap")
    );
}

#[test]
fn test_basemap_matrix_set() {
    let cap = load(fixture::WMTS_BASEMAP);
    let matrix_sets = cap.matrix_sets().unwrap();
    assert_eq!(matrix_sets.len(), 1);

    let set = &matrix_sets["google3857"];
    assert_eq!(set.crs, "urn:ogc:def:crs:EPSG:6.18:3:3857");
    assert_eq!(set.tile_matrices.len(), 5);

    let tm = &set.tile_matrices[3];
    assert_eq!(tm.id, "3");
    assert_eq!(
        tm.top_left,
        TopLeftCorner {
            x: -20037508.3428,
            y: 20037508.3428
        }
    );
    assert_eq!(tm.grid_size, (8, 8));
}

#[test]
fn test_basemap_layer() {
    let cap = load(fixture::WMTS_BASEMAP);
    let layers = cap.layers().unwrap();
    assert_eq!(layers.len(), 1);

    let layer = &layers["geolandbasemap"];
    assert_eq!(layer.title.as_deref(), Some("Geoland Basemap"));
    assert_eq!(layer.bbox.to_array(), [9.3, 46.0, 17.6, 49.2]);
    assert_eq!(layer.formats, vec!["image/jpeg"]);
    assert_eq!(layer.default_style().map(|s| s.id.as_str()), Some("normal"));
    assert!(layer.default_style().unwrap().title.is_none());
    assert_eq!(
        layer.url_template.as_ref().unwrap().to_string(),
        "https://maps1.example.at/basemap/geolandbasemap/%(style)s/%(tile_matrix_set)s\
         /%(z)s/%(y)s/%(x)s.jpeg"
    );
}

// ============================================================================
// Declared document encoding
// ============================================================================

/// Encode text whose characters all fit into one Latin-1 byte.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).expect("latin-1 character"))
        .collect()
}

#[test]
fn test_latin1_document() {
    let doc = load_fixture(fixture::WMTS_GEOSERVER)
        .replacen(r#"encoding="UTF-8""#, r#"encoding="ISO-8859-1""#, 1)
        .replace("Web Map Tile Service - GeoWebCache", "Kartendienst Grünfläche")
        .replace("<ows:Title>medford</ows:Title>", "<ows:Title>Straßen</ows:Title>");

    let cap = parse_capabilities(&latin1(&doc)).unwrap();
    assert_eq!(cap.service().title.as_deref(), Some("Kartendienst Grünfläche"));

    let layers = cap.layers().unwrap();
    assert!(layers
        .values()
        .any(|layer| layer.title.as_deref() == Some("Straßen")));
}

// ============================================================================
// Structural errors
// ============================================================================

const HEADER: &str = r#"<Capabilities xmlns="http://www.opengis.net/wmts/1.0" xmlns:ows="http://www.opengis.net/ows/1.1">"#;

#[test]
fn test_undeclared_matrix_set_link() {
    let doc = format!(
        "{}<Contents><Layer><ows:Identifier>a</ows:Identifier>\
         <ows:WGS84BoundingBox><ows:LowerCorner>0 0</ows:LowerCorner>\
         <ows:UpperCorner>1 1</ows:UpperCorner></ows:WGS84BoundingBox>\
         <TileMatrixSetLink><TileMatrixSet>missing</TileMatrixSet></TileMatrixSetLink>\
         </Layer></Contents></Capabilities>",
        HEADER
    );
    let cap = parse_capabilities(doc.as_bytes()).unwrap();
    let err = cap.layers().unwrap_err();
    assert!(matches!(err, ProxyError::Capabilities(_)));
    assert_eq!(
        err.user_msg(),
        "Matrix set required by layer not defined in capabilities document"
    );
}

#[test]
fn test_layer_without_request_mechanism() {
    let doc = format!(
        "{}<Contents><Layer><ows:Identifier>a</ows:Identifier>\
         <ows:WGS84BoundingBox><ows:LowerCorner>0 0</ows:LowerCorner>\
         <ows:UpperCorner>1 1</ows:UpperCorner></ows:WGS84BoundingBox>\
         </Layer></Contents></Capabilities>",
        HEADER
    );
    let cap = parse_capabilities(doc.as_bytes()).unwrap();
    let layer = cap.layer("a").unwrap().unwrap();
    assert!(layer.url_template.is_none());
    assert!(layer.matrix_sets.is_empty());
}

#[test]
fn test_invalid_tile_width() {
    let doc = format!(
        "{}<Contents><TileMatrixSet><ows:Identifier>s</ows:Identifier>\
         <ows:SupportedCRS>EPSG:4326</ows:SupportedCRS><TileMatrix>\
         <ows:Identifier>0</ows:Identifier><ScaleDenominator>1.0</ScaleDenominator>\
         <TopLeftCorner>90 -180</TopLeftCorner><TileWidth>wide</TileWidth>\
         <TileHeight>256</TileHeight><MatrixWidth>1</MatrixWidth><MatrixHeight>1</MatrixHeight>\
         </TileMatrix></TileMatrixSet></Contents></Capabilities>",
        HEADER
    );
    let cap = parse_capabilities(doc.as_bytes()).unwrap();
    let err = cap.matrix_sets().unwrap_err();
    assert!(matches!(err, ProxyError::Capabilities(_)));
    assert!(err.system_msg().contains("TileWidth"));
}

#[test]
fn test_missing_wgs84_bounding_box() {
    let doc = format!(
        "{}<Contents><Layer><ows:Identifier>a</ows:Identifier></Layer></Contents></Capabilities>",
        HEADER
    );
    let cap = parse_capabilities(doc.as_bytes()).unwrap();
    assert!(matches!(cap.layers(), Err(ProxyError::Capabilities(_))));
}
