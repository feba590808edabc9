//! Spatial reference system identification and bbox transformation.

use std::fmt;

use wmtsproxy_common::BoundingBox;

use crate::mercator;
use crate::utm::TransverseMercator;

/// Geographic (lat/long) EPSG codes.
const GEOGRAPHIC_CODES: &[u32] = &[4326, 4258];

/// Codes that are spherical web mercator under different names.
const WEB_MERCATOR_CODES: &[u32] = &[3857, 900913, 3785, 102100, 102113];

/// Points sampled per bbox edge when transforming.
const EDGE_SAMPLES: usize = 16;

/// Projection family of a supported reference system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SrsKind {
    Geographic,
    WebMercator,
    Utm(TransverseMercator),
}

/// A spatial reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srs {
    epsg: u32,
    kind: SrsKind,
}

impl Srs {
    /// EPSG:4326.
    pub fn wgs84() -> Self {
        Self {
            epsg: 4326,
            kind: SrsKind::Geographic,
        }
    }

    /// Look up a reference system by EPSG code.
    pub fn from_epsg(epsg: u32) -> Result<Self, SrsError> {
        let kind = if GEOGRAPHIC_CODES.contains(&epsg) {
            SrsKind::Geographic
        } else if WEB_MERCATOR_CODES.contains(&epsg) {
            SrsKind::WebMercator
        } else {
            match epsg {
                // ETRS89 / UTM zones 28N-38N
                25828..=25838 => SrsKind::Utm(TransverseMercator::utm((epsg - 25800) as u8, false)),
                // WGS84 / UTM zones 1N-60N
                32601..=32660 => SrsKind::Utm(TransverseMercator::utm((epsg - 32600) as u8, false)),
                // WGS84 / UTM zones 1S-60S
                32701..=32760 => SrsKind::Utm(TransverseMercator::utm((epsg - 32700) as u8, true)),
                _ => return Err(SrsError::UnsupportedSrs(format!("EPSG:{}", epsg))),
            }
        };
        Ok(Self { epsg, kind })
    }

    /// Parse an SRS code as used in WMS documents and requests.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:3857"
    /// - "CRS:84" (equivalent to EPSG:4326 with lon/lat axis order)
    pub fn from_code(code: &str) -> Result<Self, SrsError> {
        let normalized = code.trim().to_uppercase();
        if normalized == "CRS:84" {
            return Ok(Self::wgs84());
        }

        let epsg = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| SrsError::InvalidCode(code.to_string()))?;

        Self::from_epsg(epsg)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    pub fn kind(&self) -> SrsKind {
        self.kind
    }

    /// Code in the form used by configuration files, e.g. "EPSG:4326".
    pub fn srs_code(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    /// Check if this is a geographic (lat/long) reference system.
    pub fn is_latlong(&self) -> bool {
        matches!(self.kind, SrsKind::Geographic)
    }

    /// Convert one coordinate to WGS84 (lon, lat in degrees).
    pub fn to_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        match self.kind {
            SrsKind::Geographic => (x, y),
            SrsKind::WebMercator => mercator::to_wgs84(x, y),
            SrsKind::Utm(proj) => proj.inverse(x, y),
        }
    }

    /// Transform a bounding box into WGS84 degrees.
    ///
    /// Edges are sampled so curved edges of the projected box are covered.
    pub fn transform_bbox_to_wgs84(&self, bbox: &BoundingBox) -> BoundingBox {
        if self.is_latlong() {
            return *bbox;
        }

        let mut min_lon = f64::INFINITY;
        let mut min_lat = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        let mut max_lat = f64::NEG_INFINITY;

        let mut add = |x: f64, y: f64| {
            let (lon, lat) = self.to_wgs84(x, y);
            min_lon = min_lon.min(lon);
            min_lat = min_lat.min(lat);
            max_lon = max_lon.max(lon);
            max_lat = max_lat.max(lat);
        };

        for i in 0..=EDGE_SAMPLES {
            let frac = i as f64 / EDGE_SAMPLES as f64;
            let x = bbox.min_x + frac * bbox.width();
            let y = bbox.min_y + frac * bbox.height();

            // Bottom and top edges
            add(x, bbox.min_y);
            add(x, bbox.max_y);
            // Left and right edges
            add(bbox.min_x, y);
            add(bbox.max_x, y);
        }

        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }
}

impl fmt::Display for Srs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Whether an SRS code is on the supported allow-list.
pub fn is_supported_srs(code: &str) -> bool {
    Srs::from_code(code).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SrsError {
    #[error("Unsupported SRS: {0}")]
    UnsupportedSrs(String),

    #[error("Invalid SRS code: {0}")]
    InvalidCode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_parse_srs_codes() {
        assert_eq!(Srs::from_code("EPSG:4326").unwrap().epsg(), 4326);
        assert_eq!(Srs::from_code("epsg:3857").unwrap().epsg(), 3857);
        assert_eq!(Srs::from_code("CRS:84").unwrap().epsg(), 4326);
        assert!(matches!(
            Srs::from_code("EPSG:99999"),
            Err(SrsError::UnsupportedSrs(_))
        ));
        assert!(matches!(
            Srs::from_code("urn:ogc:def:crs:EPSG::4326"),
            Err(SrsError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_latlong() {
        assert!(Srs::from_epsg(4326).unwrap().is_latlong());
        assert!(Srs::from_epsg(4258).unwrap().is_latlong());
        assert!(!Srs::from_epsg(3857).unwrap().is_latlong());
        assert!(!Srs::from_epsg(25832).unwrap().is_latlong());
    }

    #[test]
    fn test_utm_zone_mapping() {
        match Srs::from_epsg(25833).unwrap().kind() {
            SrsKind::Utm(proj) => {
                assert_eq!(proj.zone, 33);
                assert!(!proj.south);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        match Srs::from_epsg(32733).unwrap().kind() {
            SrsKind::Utm(proj) => {
                assert_eq!(proj.zone, 33);
                assert!(proj.south);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_supported_srs_allow_list() {
        for code in ["EPSG:4326", "EPSG:900913", "EPSG:102100", "EPSG:25832", "CRS:84"] {
            assert!(is_supported_srs(code), "{} should be supported", code);
        }
        for code in ["EPSG:31287", "EPSG:2056", "EPSG:4269", "AUTO:42001", ""] {
            assert!(!is_supported_srs(code), "{} should not be supported", code);
        }
    }

    #[test]
    fn test_transform_web_mercator_world() {
        let srs = Srs::from_epsg(900913).unwrap();
        let shift = mercator::ORIGIN_SHIFT;
        let bbox = srs.transform_bbox_to_wgs84(&BoundingBox::new(-shift, -shift, shift, shift));
        assert_approx_eq!(bbox.min_x, -180.0, 1e-9);
        assert_approx_eq!(bbox.max_x, 180.0, 1e-9);
        assert_approx_eq!(bbox.min_y, -mercator::MAX_LATITUDE, 1e-9);
        assert_approx_eq!(bbox.max_y, mercator::MAX_LATITUDE, 1e-9);
    }

    #[test]
    fn test_transform_geographic_is_identity() {
        let bbox = BoundingBox::new(9.3, 46.0, 17.6, 49.2);
        assert_eq!(Srs::wgs84().transform_bbox_to_wgs84(&bbox), bbox);
    }

    #[test]
    fn test_transform_utm_covers_curved_edges() {
        let srs = Srs::from_epsg(25832).unwrap();
        let bbox = srs.transform_bbox_to_wgs84(&BoundingBox::new(
            280000.0, 5200000.0, 920000.0, 6100000.0,
        ));
        assert!(bbox.is_ordered());
        assert!(bbox.min_x > 5.0 && bbox.min_x < 6.5, "min_x {}", bbox.min_x);
        assert!(bbox.max_x > 14.0 && bbox.max_x < 16.0, "max_x {}", bbox.max_x);
        assert!(bbox.min_y > 46.5 && bbox.min_y < 47.5, "min_y {}", bbox.min_y);
        assert!(bbox.max_y > 54.5 && bbox.max_y < 55.5, "max_y {}", bbox.max_y);
    }
}
