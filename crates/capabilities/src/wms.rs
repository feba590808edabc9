//! OGC WMS 1.1.1 and 1.3.0 capabilities parsing.
//!
//! Only what is needed to register a WMS layer is read: named layers with
//! their (inherited) SRS lists, bounding boxes, opacity, resolution hints and
//! the GetMap endpoint.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use wmtsproxy_common::{BoundingBox, ProxyError, ProxyResult};

use crate::xml::{Element, Namespaces};

pub const WMS_NAMESPACE: &str = "http://www.opengis.net/wms";
const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

const WMS_111: Namespaces = Namespaces {
    default: "",
    prefixes: &[("xlink", XLINK_NAMESPACE)],
};

const WMS_130: Namespaces = Namespaces {
    default: WMS_NAMESPACE,
    prefixes: &[("xlink", XLINK_NAMESPACE)],
};

/// Geographic CRS written latitude first in WMS 1.3.0 bounding boxes.
const LATITUDE_FIRST_CRS: &[&str] = &["EPSG:4326", "EPSG:4258", "EPSG:4269"];

/// Pixel size assumed by OGC scale denominators, in meters.
const PIXEL_SIZE: f64 = 0.28e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmsVersion {
    V111,
    V130,
}

impl WmsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WmsVersion::V111 => "1.1.1",
            WmsVersion::V130 => "1.3.0",
        }
    }

    fn namespaces(&self) -> &'static Namespaces {
        match self {
            WmsVersion::V111 => &WMS_111,
            WmsVersion::V130 => &WMS_130,
        }
    }

    fn srs_element(&self) -> &'static str {
        match self {
            WmsVersion::V111 => "SRS",
            WmsVersion::V130 => "CRS",
        }
    }
}

/// Resolution range a layer is intended for, in SRS units per pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResolutionHint {
    /// Finest resolution
    pub min_res: Option<f64>,
    /// Coarsest resolution
    pub max_res: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WmsLayer {
    pub name: String,
    pub title: Option<String>,
    /// SRS codes in document order, including those inherited from parents.
    pub srs: Vec<String>,
    /// WGS84 bounding box
    pub llbbox: Option<BoundingBox>,
    /// Per-SRS bounding boxes in x/y order.
    pub bbox_srs: Vec<(String, BoundingBox)>,
    pub opaque: bool,
    /// GetMap endpoint
    pub url: String,
    pub res_hint: Option<ResolutionHint>,
}

impl WmsLayer {
    pub fn supports_srs(&self, srs: &str) -> bool {
        self.srs.iter().any(|s| s == srs)
    }

    /// Declared bounding box for `srs`.
    pub fn bbox_for(&self, srs: &str) -> Option<&BoundingBox> {
        self.bbox_srs
            .iter()
            .find(|(code, _)| code == srs)
            .map(|(_, bbox)| bbox)
    }
}

#[derive(Debug, Clone)]
pub struct WmsCapabilities {
    pub version: WmsVersion,
    pub title: Option<String>,
    /// Named layers in document order.
    pub layers: Vec<WmsLayer>,
}

impl WmsCapabilities {
    pub fn layer(&self, name: &str) -> Option<&WmsLayer> {
        self.layers.iter().find(|l| l.name == name)
    }
}

/// Parse a WMS 1.1.1 or 1.3.0 capabilities document.
pub fn parse_wms_capabilities(bytes: &[u8]) -> ProxyResult<WmsCapabilities> {
    let root = Element::parse(bytes).map_err(|e| {
        ProxyError::capabilities("Could not open capabilities document").with_cause(e)
    })?;

    let version = if root.is("", "WMT_MS_Capabilities") {
        WmsVersion::V111
    } else if root.is(WMS_NAMESPACE, "WMS_Capabilities") {
        WmsVersion::V130
    } else {
        return Err(ProxyError::capabilities("Not a WMS capabilities document")
            .with_cause(format!("unexpected root element {}", root.tag())));
    };
    let ns = version.namespaces();

    let url = root
        .find(ns, "Capability/Request/GetMap/DCPType/HTTP/Get/OnlineResource")
        .and_then(|e| e.attr(ns, "xlink:href"))
        .ok_or_else(|| invalid_document("missing GetMap OnlineResource".to_string()))?
        .to_string();

    let parser = LayerParser { version, url };
    let mut layers = Vec::new();
    for layer_elem in root.findall(ns, "Capability/Layer") {
        parser.collect(layer_elem, &Inherited::default(), &mut layers)?;
    }

    debug!(
        version = version.as_str(),
        layers = layers.len(),
        "Parsed WMS capabilities"
    );

    Ok(WmsCapabilities {
        version,
        title: root.findtext_owned(ns, "Service/Title"),
        layers,
    })
}

/// Properties a layer passes on to its children.
#[derive(Debug, Clone, Default)]
struct Inherited {
    srs: Vec<String>,
    llbbox: Option<BoundingBox>,
    bbox_srs: Vec<(String, BoundingBox)>,
    opaque: bool,
    res_hint: Option<ResolutionHint>,
}

struct LayerParser {
    version: WmsVersion,
    url: String,
}

impl LayerParser {
    fn collect(
        &self,
        elem: &Element,
        parent: &Inherited,
        out: &mut Vec<WmsLayer>,
    ) -> ProxyResult<()> {
        let ns = self.version.namespaces();
        let mut props = parent.clone();

        let mut seen: BTreeSet<String> = props.srs.iter().cloned().collect();
        for srs_elem in elem.findall(ns, self.version.srs_element()) {
            for code in srs_elem.text().split_whitespace() {
                if seen.insert(code.to_string()) {
                    props.srs.push(code.to_string());
                }
            }
        }

        if let Some(llbbox) = self.llbbox(elem)? {
            props.llbbox = Some(llbbox);
        }

        for (srs, bbox) in self.srs_bboxes(elem)? {
            match props.bbox_srs.iter_mut().find(|(code, _)| *code == srs) {
                Some(entry) => entry.1 = bbox,
                None => props.bbox_srs.push((srs, bbox)),
            }
        }

        match elem.attr(ns, "none:opaque") {
            Some("1") | Some("true") => props.opaque = true,
            Some("0") | Some("false") => props.opaque = false,
            _ => {}
        }

        if let Some(hint) = self.res_hint(elem)? {
            props.res_hint = Some(hint);
        }

        if let Some(name) = elem.findtext_owned(ns, "Name") {
            out.push(WmsLayer {
                name,
                title: elem.findtext_owned(ns, "Title"),
                srs: props.srs.clone(),
                llbbox: props.llbbox,
                bbox_srs: props.bbox_srs.clone(),
                opaque: props.opaque,
                url: self.url.clone(),
                res_hint: props.res_hint,
            });
        }

        for child in elem.findall(ns, "Layer") {
            self.collect(child, &props, out)?;
        }
        Ok(())
    }

    fn llbbox(&self, elem: &Element) -> ProxyResult<Option<BoundingBox>> {
        let ns = self.version.namespaces();
        match self.version {
            WmsVersion::V111 => match elem.find(ns, "LatLonBoundingBox") {
                Some(bbox_elem) => Ok(Some(attr_bbox(ns, bbox_elem)?)),
                None => Ok(None),
            },
            WmsVersion::V130 => {
                let Some(bbox_elem) = elem.find(ns, "EX_GeographicBoundingBox") else {
                    return Ok(None);
                };
                let value = |path: &str| -> ProxyResult<f64> {
                    let text = bbox_elem.findtext(ns, path).unwrap_or_default();
                    parse_float(path, text)
                };
                Ok(Some(BoundingBox::new(
                    value("westBoundLongitude")?,
                    value("southBoundLatitude")?,
                    value("eastBoundLongitude")?,
                    value("northBoundLatitude")?,
                )))
            }
        }
    }

    fn srs_bboxes(&self, elem: &Element) -> ProxyResult<Vec<(String, BoundingBox)>> {
        let ns = self.version.namespaces();
        let srs_attr = match self.version {
            WmsVersion::V111 => "none:SRS",
            WmsVersion::V130 => "none:CRS",
        };

        let mut bboxes = Vec::new();
        for bbox_elem in elem.findall(ns, "BoundingBox") {
            let Some(srs) = bbox_elem.attr(ns, srs_attr) else {
                continue;
            };
            let mut bbox = attr_bbox(ns, bbox_elem)?;
            if self.version == WmsVersion::V130 && LATITUDE_FIRST_CRS.contains(&srs) {
                bbox = BoundingBox::new(bbox.min_y, bbox.min_x, bbox.max_y, bbox.max_x);
            }
            bboxes.push((srs.to_string(), bbox));
        }
        Ok(bboxes)
    }

    fn res_hint(&self, elem: &Element) -> ProxyResult<Option<ResolutionHint>> {
        let ns = self.version.namespaces();
        let hint = match self.version {
            WmsVersion::V111 => {
                let Some(hint_elem) = elem.find(ns, "ScaleHint") else {
                    return Ok(None);
                };
                // ScaleHint values are pixel diagonals
                let diagonal = |name: &str| -> ProxyResult<Option<f64>> {
                    hint_elem
                        .attr(ns, name)
                        .map(|v| parse_float(name, v).map(|d| d / 2f64.sqrt()))
                        .transpose()
                };
                ResolutionHint {
                    min_res: diagonal("none:min")?,
                    max_res: diagonal("none:max")?,
                }
            }
            WmsVersion::V130 => {
                let scale = |path: &str| -> ProxyResult<Option<f64>> {
                    elem.findtext_owned(ns, path)
                        .map(|v| parse_float(path, &v).map(|denom| denom * PIXEL_SIZE))
                        .transpose()
                };
                ResolutionHint {
                    min_res: scale("MinScaleDenominator")?,
                    max_res: scale("MaxScaleDenominator")?,
                }
            }
        };

        if hint.min_res.is_none() && hint.max_res.is_none() {
            return Ok(None);
        }
        Ok(Some(hint))
    }
}

fn attr_bbox(ns: &Namespaces, elem: &Element) -> ProxyResult<BoundingBox> {
    let value = |name: &str| -> ProxyResult<f64> {
        parse_float(name, elem.attr(ns, name).unwrap_or_default())
    };
    Ok(BoundingBox::new(
        value("none:minx")?,
        value("none:miny")?,
        value("none:maxx")?,
        value("none:maxy")?,
    ))
}

fn parse_float(name: &str, text: &str) -> ProxyResult<f64> {
    text.trim()
        .parse()
        .map_err(|e| invalid_document(format!("{} \"{}\": {}", name, text, e)))
}

fn invalid_document(cause: String) -> ProxyError {
    ProxyError::capabilities("Invalid WMS capabilities document").with_cause(cause)
}
