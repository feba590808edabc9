//! OGC WMTS 1.0.0 capabilities parsing.
//!
//! [`parse_capabilities`] only checks that the document is well formed and
//! has a WMTS root. Service metadata, operations, tile matrix sets and layers
//! are built on first access and kept for the lifetime of the document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::debug;

use wmtsproxy_common::{BoundingBox, ProxyError, ProxyResult};

use crate::xml::{Element, Namespaces};

pub const WMTS_NAMESPACE: &str = "http://www.opengis.net/wmts/1.0";
pub const OWS_NAMESPACE: &str = "http://www.opengis.net/ows/1.1";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

const NAMESPACES: Namespaces = Namespaces {
    default: WMTS_NAMESPACE,
    prefixes: &[("ows", OWS_NAMESPACE), ("xlink", XLINK_NAMESPACE)],
};

/// CRS identifiers whose `TopLeftCorner` is written easting first.
///
/// Every other CRS is read northing first.
pub const EASTING_FIRST_CRS: &[&str] = &[
    "CRS:84",
    "EPSG:900913",
    "EPSG:3857",
    "EPSG:25831",
    "EPSG:25832",
    "EPSG:25833",
    "urn:ogc:def:crs:EPSG::900913",
    "urn:ogc:def:crs:EPSG::3857",
    "urn:ogc:def:crs:EPSG::25831",
    "urn:ogc:def:crs:EPSG::25832",
    "urn:ogc:def:crs:EPSG::25833",
    "urn:ogc:def:crs:EPSG:6.18:3:900913",
    "urn:ogc:def:crs:EPSG:6.18:3:3857",
    "urn:ogc:def:crs:EPSG:6.18:3:25831",
    "urn:ogc:def:crs:EPSG:6.18:3:25832",
    "urn:ogc:def:crs:EPSG:6.18:3:25833",
    "urn:ogc:def:crs:OGC:1.3:CRS84",
];

/// Operation name -> binding mode ("KVP", "RESTful") -> endpoint URL.
pub type Operations = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceMetadata {
    pub title: Option<String>,
    pub service_type: Option<String>,
    pub service_type_version: Option<String>,
    pub provider_name: Option<String>,
    pub provider_site: Option<String>,
    pub provider_individual_name: Option<String>,
}

/// Top left corner of a tile matrix, `x` easting/longitude, `y` northing/latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TopLeftCorner {
    pub x: f64,
    pub y: f64,
}

impl TopLeftCorner {
    /// Parse `TopLeftCorner` text, normalizing the axis order for `crs`.
    pub fn parse(text: &str, crs: &str) -> Option<Self> {
        let mut values = text.split_whitespace().map(f64::from_str);
        let first = values.next()?.ok()?;
        let second = values.next()?.ok()?;
        if values.next().is_some() {
            return None;
        }

        if EASTING_FIRST_CRS.contains(&crs) {
            Some(Self { x: first, y: second })
        } else {
            Some(Self { x: second, y: first })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileMatrix {
    pub id: String,
    pub top_left: TopLeftCorner,
    /// (width, height) in pixels
    pub tile_size: (u32, u32),
    /// (columns, rows)
    pub grid_size: (u32, u32),
    pub scale_denom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileMatrixSet {
    pub id: String,
    pub crs: String,
    pub tile_matrices: Vec<TileMatrix>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Style {
    pub id: String,
    pub title: Option<String>,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub id: String,
    pub default: Option<String>,
    pub current: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: String,
    pub title: Option<String>,
    /// WGS84 bounding box
    pub bbox: BoundingBox,
    pub formats: Vec<String>,
    pub info_formats: Vec<String>,
    pub styles: Vec<Style>,
    pub matrix_sets: Vec<Arc<TileMatrixSet>>,
    pub dimensions: Vec<Dimension>,
    /// `None` when the layer can not be requested.
    pub url_template: Option<UrlTemplate>,
}

impl Layer {
    /// The style flagged as default, the last one if several are.
    pub fn default_style(&self) -> Option<&Style> {
        self.styles.iter().rev().find(|s| s.default)
    }

    /// Declared matrix set by identifier.
    pub fn matrix_set(&self, id: &str) -> Option<&Arc<TileMatrixSet>> {
        self.matrix_sets.iter().find(|ms| ms.id == id)
    }

    pub fn matrix_set_ids(&self) -> Vec<String> {
        self.matrix_sets.iter().map(|ms| ms.id.clone()).collect()
    }
}

// ============================================================================
// URL templates
// ============================================================================

/// Value slots of a tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Layer,
    TileMatrixSet,
    Format,
    Style,
    Dimension(String),
    /// Tile matrix (zoom level)
    Z,
    /// Tile row
    Y,
    /// Tile column
    X,
}

impl Placeholder {
    pub fn name(&self) -> &str {
        match self {
            Placeholder::Layer => "layer",
            Placeholder::TileMatrixSet => "tile_matrix_set",
            Placeholder::Format => "format",
            Placeholder::Style => "style",
            Placeholder::Dimension(id) => id,
            Placeholder::Z => "z",
            Placeholder::Y => "y",
            Placeholder::X => "x",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Param(Placeholder),
}

/// Values filled into a template when a tile source URL is built.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues<'a> {
    pub layer: &'a str,
    pub tile_matrix_set: &'a str,
    pub format: &'a str,
    pub style: &'a str,
    /// Dimension id -> value
    pub dimensions: BTreeMap<String, String>,
    /// Written in front of every tile matrix placeholder.
    pub tile_matrix_prefix: Option<&'a str>,
}

/// Tile request template of a layer.
///
/// Formats as `%(name)s` placeholders. [`UrlTemplate::render`] fills every
/// placeholder except the tile coordinates, producing a URL for a tile source
/// of the downstream proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    parts: Vec<TemplatePart>,
}

impl UrlTemplate {
    /// Build from a `ResourceURL` template.
    ///
    /// `{Style}`, `{TileMatrixSet}`, `{TileMatrix}`, `{TileRow}` and
    /// `{TileCol}` are matched case-sensitively, declared dimensions
    /// case-insensitively. Anything else is kept as literal text.
    pub fn from_resource_url(template: &str, dimensions: &[Dimension]) -> Self {
        let mut builder = PartsBuilder::default();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            builder.literal(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                builder.literal(&rest[open..]);
                rest = "";
                break;
            };

            let token = &after[..close];
            if token.contains('{') {
                builder.literal("{");
                rest = after;
                continue;
            }

            match resource_placeholder(token, dimensions) {
                Some(placeholder) => builder.param(placeholder),
                None => builder.literal(&rest[open..open + close + 2]),
            }
            rest = &after[close + 1..];
        }
        builder.literal(rest);

        Self {
            parts: builder.finish(),
        }
    }

    /// KVP GetTile request against the endpoint `href`.
    pub fn kvp(href: &str) -> Self {
        let mut builder = PartsBuilder::default();
        builder.literal(href);
        builder.literal("SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER=");
        builder.param(Placeholder::Layer);
        builder.literal("&TILEMATRIXSET=");
        builder.param(Placeholder::TileMatrixSet);
        builder.literal("&TILEMATRIX=");
        builder.param(Placeholder::Z);
        builder.literal("&TILEROW=");
        builder.param(Placeholder::Y);
        builder.literal("&TILECOL=");
        builder.param(Placeholder::X);
        builder.literal("&FORMAT=");
        builder.param(Placeholder::Format);
        Self {
            parts: builder.finish(),
        }
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Param(p) => Some(p),
            TemplatePart::Literal(_) => None,
        })
    }

    /// Fill everything but the tile coordinates.
    ///
    /// Tile coordinates stay as `%(z)s`, `%(y)s` and `%(x)s`. Literal `%`
    /// characters are doubled since the result is itself a format string.
    pub fn render(&self, values: &TemplateValues<'_>) -> String {
        let mut url = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => url.push_str(&escape_percent(text)),
                TemplatePart::Param(placeholder) => match placeholder {
                    Placeholder::Layer => url.push_str(&escape_percent(values.layer)),
                    Placeholder::TileMatrixSet => {
                        url.push_str(&escape_percent(values.tile_matrix_set))
                    }
                    Placeholder::Format => url.push_str(&escape_percent(values.format)),
                    Placeholder::Style => url.push_str(&escape_percent(values.style)),
                    Placeholder::Dimension(id) => {
                        let value = values.dimensions.get(id).map(String::as_str);
                        url.push_str(&escape_percent(value.unwrap_or("")));
                    }
                    Placeholder::Z => {
                        if let Some(prefix) = values.tile_matrix_prefix {
                            url.push_str(&escape_percent(prefix));
                        }
                        url.push_str("%(z)s");
                    }
                    Placeholder::Y => url.push_str("%(y)s"),
                    Placeholder::X => url.push_str("%(x)s"),
                },
            }
        }
        url
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => f.write_str(text)?,
                TemplatePart::Param(p) => write!(f, "%({})s", p.name())?,
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct PartsBuilder {
    parts: Vec<TemplatePart>,
    literal: String,
}

impl PartsBuilder {
    fn literal(&mut self, text: &str) {
        self.literal.push_str(text);
    }

    fn param(&mut self, placeholder: Placeholder) {
        if !self.literal.is_empty() {
            self.parts
                .push(TemplatePart::Literal(std::mem::take(&mut self.literal)));
        }
        self.parts.push(TemplatePart::Param(placeholder));
    }

    fn finish(mut self) -> Vec<TemplatePart> {
        if !self.literal.is_empty() {
            self.parts.push(TemplatePart::Literal(self.literal));
        }
        self.parts
    }
}

fn resource_placeholder(token: &str, dimensions: &[Dimension]) -> Option<Placeholder> {
    match token {
        "Style" => Some(Placeholder::Style),
        "TileMatrixSet" => Some(Placeholder::TileMatrixSet),
        "TileMatrix" => Some(Placeholder::Z),
        "TileRow" => Some(Placeholder::Y),
        "TileCol" => Some(Placeholder::X),
        _ => {
            let token = token.to_lowercase();
            dimensions
                .iter()
                .find(|d| d.id.to_lowercase() == token)
                .map(|d| Placeholder::Dimension(d.id.clone()))
        }
    }
}

fn escape_percent(text: &str) -> String {
    text.replace('%', "%%")
}

// ============================================================================
// Document
// ============================================================================

/// A parsed WMTS capabilities document.
#[derive(Debug)]
pub struct WmtsCapabilities {
    root: Element,
    service: OnceCell<ServiceMetadata>,
    operations: OnceCell<Operations>,
    matrix_sets: OnceCell<BTreeMap<String, Arc<TileMatrixSet>>>,
    layers: OnceCell<BTreeMap<String, Layer>>,
}

/// Parse a WMTS capabilities document.
pub fn parse_capabilities(bytes: &[u8]) -> ProxyResult<WmtsCapabilities> {
    let root = Element::parse(bytes).map_err(|e| {
        ProxyError::capabilities("Could not open capabilities document").with_cause(e)
    })?;
    WmtsCapabilities::from_root(root)
}

impl WmtsCapabilities {
    pub fn from_root(root: Element) -> ProxyResult<Self> {
        if !root.is(WMTS_NAMESPACE, "Capabilities") {
            return Err(ProxyError::capabilities("Not a WMTS capabilities document")
                .with_cause(format!("unexpected root element {}", root.tag())));
        }

        Ok(Self {
            root,
            service: OnceCell::new(),
            operations: OnceCell::new(),
            matrix_sets: OnceCell::new(),
            layers: OnceCell::new(),
        })
    }

    pub fn namespaces(&self) -> &'static Namespaces {
        &NAMESPACES
    }

    pub fn service(&self) -> &ServiceMetadata {
        self.service.get_or_init(|| {
            let ns = &NAMESPACES;
            let root = &self.root;
            ServiceMetadata {
                title: root.findtext_owned(ns, "ows:ServiceIdentification/ows:Title"),
                service_type: root.findtext_owned(ns, "ows:ServiceIdentification/ows:ServiceType"),
                service_type_version: root
                    .findtext_owned(ns, "ows:ServiceIdentification/ows:ServiceTypeVersion"),
                provider_name: root.findtext_owned(ns, "ows:ServiceProvider/ows:ProviderName"),
                provider_site: root
                    .find(ns, "ows:ServiceProvider/ows:ProviderSite")
                    .and_then(|e| e.attr(ns, "xlink:href"))
                    .map(str::to_string),
                provider_individual_name: root.findtext_owned(
                    ns,
                    "ows:ServiceProvider/ows:ServiceContact/ows:IndividualName",
                ),
            }
        })
    }

    /// Endpoints per operation and binding mode, first declaration wins.
    pub fn operations(&self) -> &Operations {
        self.operations.get_or_init(|| {
            let ns = &NAMESPACES;
            let mut operations = Operations::new();
            for op_elem in self.root.findall(ns, "ows:OperationsMetadata/ows:Operation") {
                let Some(name) = op_elem.attr(ns, "none:name") else {
                    continue;
                };
                let modes = operations.entry(name.to_string()).or_default();
                for get_elem in op_elem.findall(ns, "ows:DCP/ows:HTTP/ows:Get") {
                    let Some(href) = get_elem.attr(ns, "xlink:href") else {
                        continue;
                    };
                    let mode = get_elem
                        .findtext(ns, "ows:Constraint/ows:AllowedValues/ows:Value")
                        .unwrap_or_default();
                    modes
                        .entry(mode.to_string())
                        .or_insert_with(|| href.to_string());
                }
            }
            operations
        })
    }

    /// Endpoint of `operation` for binding `mode`, if advertised.
    pub fn operation_url(&self, operation: &str, mode: &str) -> Option<&str> {
        self.operations()
            .get(operation)
            .and_then(|modes| modes.get(mode))
            .map(String::as_str)
    }

    pub fn matrix_sets(&self) -> ProxyResult<&BTreeMap<String, Arc<TileMatrixSet>>> {
        self.matrix_sets.get_or_try_init(|| self.parse_matrix_sets())
    }

    /// All layers. Fails if the document declares none.
    pub fn layers(&self) -> ProxyResult<&BTreeMap<String, Layer>> {
        self.layers.get_or_try_init(|| self.parse_layers())
    }

    pub fn layer(&self, id: &str) -> ProxyResult<Option<&Layer>> {
        Ok(self.layers()?.get(id))
    }

    fn parse_matrix_sets(&self) -> ProxyResult<BTreeMap<String, Arc<TileMatrixSet>>> {
        let ns = &NAMESPACES;
        let mut matrix_sets = BTreeMap::new();

        for set_elem in self.root.findall(ns, "Contents/TileMatrixSet") {
            let id = required_text(set_elem, "ows:Identifier")?.to_string();
            let crs = required_text(set_elem, "ows:SupportedCRS")?.to_string();

            let mut tile_matrices = Vec::new();
            for tm_elem in set_elem.findall(ns, "TileMatrix") {
                let top_left_text = required_text(tm_elem, "TopLeftCorner")?;
                let top_left = TopLeftCorner::parse(top_left_text, &crs).ok_or_else(|| {
                    invalid_document(format!("invalid TopLeftCorner \"{}\"", top_left_text))
                })?;

                tile_matrices.push(TileMatrix {
                    id: required_text(tm_elem, "ows:Identifier")?.to_string(),
                    top_left,
                    tile_size: (
                        parse_number(tm_elem, "TileWidth")?,
                        parse_number(tm_elem, "TileHeight")?,
                    ),
                    grid_size: (
                        parse_number(tm_elem, "MatrixWidth")?,
                        parse_number(tm_elem, "MatrixHeight")?,
                    ),
                    scale_denom: parse_number(tm_elem, "ScaleDenominator")?,
                });
            }

            debug!(
                matrix_set = %id,
                crs = %crs,
                levels = tile_matrices.len(),
                "Parsed tile matrix set"
            );
            matrix_sets.insert(
                id.clone(),
                Arc::new(TileMatrixSet {
                    id,
                    crs,
                    tile_matrices,
                }),
            );
        }

        Ok(matrix_sets)
    }

    fn parse_layers(&self) -> ProxyResult<BTreeMap<String, Layer>> {
        let ns = &NAMESPACES;
        let layer_elems = self.root.findall(ns, "Contents/Layer");
        if layer_elems.is_empty() {
            return Err(ProxyError::capabilities("Document contains no layer"));
        }

        // Layers reference matrix sets by identifier
        let matrix_sets = self.matrix_sets()?;

        let mut layers = BTreeMap::new();
        for layer_elem in layer_elems {
            let id = required_text(layer_elem, "ows:Identifier")?.to_string();

            let lower = required_text(layer_elem, "ows:WGS84BoundingBox/ows:LowerCorner")?;
            let upper = required_text(layer_elem, "ows:WGS84BoundingBox/ows:UpperCorner")?;
            let bbox = BoundingBox::from_corners(lower, upper)
                .map_err(|e| invalid_document(format!("layer \"{}\": {}", id, e)))?;

            let texts = |path: &str| -> Vec<String> {
                layer_elem
                    .findall(ns, path)
                    .into_iter()
                    .map(|e| e.text().to_string())
                    .collect()
            };

            let styles = layer_elem
                .findall(ns, "Style")
                .into_iter()
                .map(|style_elem| Style {
                    id: style_elem
                        .findtext(ns, "ows:Identifier")
                        .unwrap_or_default()
                        .to_string(),
                    title: style_elem.findtext_owned(ns, "ows:Title"),
                    default: style_elem.attr(ns, "none:isDefault") == Some("true"),
                })
                .collect();

            let dimensions: Vec<Dimension> = layer_elem
                .findall(ns, "Dimension")
                .into_iter()
                .map(|dim_elem| Dimension {
                    id: dim_elem
                        .findtext(ns, "ows:Identifier")
                        .unwrap_or_default()
                        .to_string(),
                    default: dim_elem.findtext_owned(ns, "Default"),
                    current: dim_elem.findtext_owned(ns, "Current"),
                    value: dim_elem.findtext_owned(ns, "Value"),
                })
                .collect();

            let mut layer_matrix_sets = Vec::new();
            for link in layer_elem.findall(ns, "TileMatrixSetLink") {
                let set_id = link.findtext(ns, "TileMatrixSet").unwrap_or_default();
                let matrix_set = matrix_sets.get(set_id).ok_or_else(|| {
                    ProxyError::capabilities(
                        "Matrix set required by layer not defined in capabilities document",
                    )
                    .with_cause(format!("layer \"{}\" links \"{}\"", id, set_id))
                })?;
                layer_matrix_sets.push(Arc::clone(matrix_set));
            }

            let url_template = self.url_template(layer_elem, &dimensions);
            if url_template.is_none() {
                debug!(layer = %id, "Layer has no usable tile URL");
            }

            layers.insert(
                id.clone(),
                Layer {
                    title: layer_elem.findtext_owned(ns, "ows:Title"),
                    bbox,
                    formats: texts("Format"),
                    info_formats: texts("InfoFormat"),
                    styles,
                    matrix_sets: layer_matrix_sets,
                    dimensions,
                    url_template,
                    id,
                },
            );
        }

        Ok(layers)
    }

    fn url_template(&self, layer_elem: &Element, dimensions: &[Dimension]) -> Option<UrlTemplate> {
        let ns = &NAMESPACES;
        let resources = layer_elem.findall(ns, "ResourceURL");
        let resource = resources
            .iter()
            .find(|r| r.attr(ns, "none:resourceType") == Some("tile"))
            .or_else(|| resources.first());

        if let Some(template) = resource.and_then(|r| r.attr(ns, "none:template")) {
            return Some(UrlTemplate::from_resource_url(template, dimensions));
        }

        self.operation_url("GetTile", "KVP").map(UrlTemplate::kvp)
    }
}

fn invalid_document(cause: String) -> ProxyError {
    ProxyError::capabilities("Invalid WMTS capabilities document").with_cause(cause)
}

fn required_text<'e>(elem: &'e Element, path: &str) -> ProxyResult<&'e str> {
    elem.findtext(&NAMESPACES, path)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid_document(format!("missing {} in {}", path, elem.local_name())))
}

fn parse_number<T>(elem: &Element, path: &str) -> ProxyResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let text = required_text(elem, path)?;
    text.parse()
        .map_err(|e| invalid_document(format!("{} \"{}\": {}", path, text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dimension(id: &str) -> Dimension {
        Dimension {
            id: id.to_string(),
            default: None,
            current: None,
            value: None,
        }
    }

    #[test]
    fn test_top_left_axis_order() {
        let tl = TopLeftCorner::parse("90.0 -180.0", "urn:ogc:def:crs:EPSG::4326").unwrap();
        assert_eq!(tl, TopLeftCorner { x: -180.0, y: 90.0 });

        let tl = TopLeftCorner::parse("-180 90", "urn:ogc:def:crs:OGC:1.3:CRS84").unwrap();
        assert_eq!(tl, TopLeftCorner { x: -180.0, y: 90.0 });

        let tl = TopLeftCorner::parse(
            "-20037508.3428 20037508.3428",
            "urn:ogc:def:crs:EPSG:6.18:3:3857",
        )
        .unwrap();
        assert_eq!(
            tl,
            TopLeftCorner {
                x: -20037508.3428,
                y: 20037508.3428
            }
        );

        assert!(TopLeftCorner::parse("1.0", "CRS:84").is_none());
        assert!(TopLeftCorner::parse("1.0 2.0 3.0", "CRS:84").is_none());
        assert!(TopLeftCorner::parse("a b", "CRS:84").is_none());
    }

    #[test]
    fn test_resource_url_template() {
        let template = UrlTemplate::from_resource_url(
            "http://tiles.example.com/{Layer}/{Style}/{time}/{TileMatrixSet}/{TileMatrix}/{TileRow}/{TileCol}.png",
            &[dimension("Time")],
        );
        assert_eq!(
            template.to_string(),
            "http://tiles.example.com/{Layer}/%(style)s/%(Time)s/%(tile_matrix_set)s/%(z)s/%(y)s/%(x)s.png"
        );

        let names: Vec<&str> = template.placeholders().map(Placeholder::name).collect();
        assert_eq!(names, vec!["style", "Time", "tile_matrix_set", "z", "y", "x"]);
    }

    #[test]
    fn test_resource_url_keeps_unbalanced_braces() {
        let template = UrlTemplate::from_resource_url("http://a/{x{TileRow}/{TileCol", &[]);
        assert_eq!(template.to_string(), "http://a/{x%(y)s/{TileCol");
    }

    #[test]
    fn test_placeholders_are_case_sensitive() {
        let template = UrlTemplate::from_resource_url("http://a/{tilematrix}/{TileMatrix}", &[]);
        assert_eq!(template.to_string(), "http://a/{tilematrix}/%(z)s");
    }

    #[test]
    fn test_kvp_template() {
        let template = UrlTemplate::kvp("http://example.com/wmts?");
        assert_eq!(
            template.to_string(),
            "http://example.com/wmts?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER=%(layer)s\
             &TILEMATRIXSET=%(tile_matrix_set)s&TILEMATRIX=%(z)s&TILEROW=%(y)s&TILECOL=%(x)s\
             &FORMAT=%(format)s"
        );
    }

    #[test]
    fn test_render_fills_everything_but_tile_coordinates() {
        let template = UrlTemplate::from_resource_url(
            "http://a/%7E/{Style}/{elevation}/{TileMatrixSet}/{TileMatrix}/{TileRow}/{TileCol}",
            &[dimension("elevation")],
        );
        let mut values = TemplateValues {
            layer: "l",
            tile_matrix_set: "EPSG:4326",
            format: "image/png",
            style: "default",
            tile_matrix_prefix: Some("EPSG:4326:"),
            ..Default::default()
        };
        assert_eq!(
            template.render(&values),
            "http://a/%%7E/default//EPSG:4326/EPSG:4326:%(z)s/%(y)s/%(x)s"
        );

        values
            .dimensions
            .insert("elevation".to_string(), "100m".to_string());
        values.tile_matrix_prefix = None;
        assert_eq!(
            template.render(&values),
            "http://a/%%7E/default/100m/EPSG:4326/%(z)s/%(y)s/%(x)s"
        );
    }

    #[test]
    fn test_wrong_root_element() {
        let doc = br#"<WMS_Capabilities xmlns="http://www.opengis.net/wms"/>"#;
        let err = parse_capabilities(doc).unwrap_err();
        assert!(matches!(err, ProxyError::Capabilities(_)));
        assert_eq!(err.user_msg(), "Not a WMTS capabilities document");
    }

    #[test]
    fn test_not_well_formed() {
        let err = parse_capabilities(b"<Capabilities").unwrap_err();
        assert!(matches!(err, ProxyError::Capabilities(_)));
        assert_eq!(err.user_msg(), "Could not open capabilities document");
    }

    #[test]
    fn test_document_without_layers() {
        let doc = br#"<Capabilities xmlns="http://www.opengis.net/wmts/1.0"><Contents/></Capabilities>"#;
        let cap = parse_capabilities(doc).unwrap();
        let err = cap.layers().unwrap_err();
        assert_eq!(err.user_msg(), "Document contains no layer");
        assert!(cap.matrix_sets().unwrap().is_empty());
    }
}
