//! Tile grid derivation from WMTS tile matrix sets.
//!
//! The downstream proxy describes a grid with one SRS, one tile size, one
//! origin and a list of resolutions. A tile matrix set only maps onto that
//! when its matrices are numbered `0..N` and share tile size and top left
//! corner. Anything else is rejected with a [`TileMatrixError`].

use capabilities::{TileMatrix, TileMatrixSet, TopLeftCorner};
use projection::Srs;
use thiserror::Error;
use tracing::debug;
use wmtsproxy_common::{mangle_name, BoundingBox};

/// Size of a rendered pixel assumed by OGC scale denominators, in meters.
pub const STANDARDIZED_PIXEL_SIZE: f64 = 0.28e-3;

/// Meters per degree at the equator of the web mercator sphere.
pub const METERS_PER_DEGREE: f64 = 20037508.342789244 / 180.0;

const CRS84_URN: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";
const EPSG_URN_PREFIX: &str = "urn:ogc:def:crs:EPSG:";

/// Decimal places kept in derived bounding boxes.
const BBOX_DECIMALS: i32 = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileMatrixError {
    #[error("TileMatrixSet without numeric range identifier (at \"{0}\")")]
    NonNumericRange(String),

    #[error("TileMatrixSet without clearly identifiable prefix (at \"{0}\")")]
    AmbiguousPrefix(String),

    #[error("TileMatrixSet with non-uniform TileWidth/TileHeight (at \"{0}\")")]
    NonUniformTileSize(String),

    #[error("TileMatrixSet with non-uniform TopLeftCorners (at \"{0}\")")]
    NonUniformTopLeft(String),

    #[error("Unsupported CRS \"{0}\"")]
    UnsupportedCrs(String),

    #[error("TileMatrixSet without tile matrices")]
    Empty,
}

/// A grid in the shape the downstream proxy configures it.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Matrix set identifier with `:` replaced
    pub name: String,
    pub srs: Srs,
    /// (width, height) in pixels
    pub tile_size: (u32, u32),
    /// Units per pixel, one per matrix in document order
    pub resolutions: Vec<f64>,
    /// (west, south, east, north) in SRS units
    pub bbox: BoundingBox,
    /// Identifier text in front of the level number, e.g. `EPSG:4326:`
    pub prefix: Option<String>,
    pub number_range: bool,
}

/// Map a WMTS `SupportedCRS` value to a reference system.
///
/// Accepts `EPSG:<code>`, the OGC CRS84 URN and
/// `urn:ogc:def:crs:EPSG:<version>:<code>` where the version may be empty
/// or contain colons itself.
pub fn crs_to_srs(crs: &str) -> Result<Srs, TileMatrixError> {
    let unsupported = || TileMatrixError::UnsupportedCrs(crs.to_string());

    if crs.starts_with("EPSG:") {
        return Srs::from_code(crs).map_err(|_| unsupported());
    }
    if crs == CRS84_URN {
        return Ok(Srs::wgs84());
    }

    let rest = crs.strip_prefix(EPSG_URN_PREFIX).ok_or_else(unsupported)?;
    let code = match rest.rsplit_once(':') {
        Some((_version, code)) => code,
        None => return Err(unsupported()),
    };
    if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unsupported());
    }
    let epsg: u32 = code.parse().map_err(|_| unsupported())?;
    Srs::from_epsg(epsg).map_err(|_| unsupported())
}

/// Split a matrix identifier into its trailing number and the text before it.
///
/// Returns `None` when the identifier does not end in digits. The prefix is
/// `None` for purely numeric identifiers.
pub fn split_identifier(id: &str) -> Option<(u64, Option<&str>)> {
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let number = id[digits_start..].parse().ok()?;
    let prefix = match &id[..digits_start] {
        "" => None,
        prefix => Some(prefix),
    };
    Some((number, prefix))
}

/// Ground units per pixel for an OGC scale denominator.
pub fn scale_to_res(scale_denom: f64, srs: &Srs) -> f64 {
    scale_denom * STANDARDIZED_PIXEL_SIZE / meters_per_unit(srs)
}

fn meters_per_unit(srs: &Srs) -> f64 {
    if srs.is_latlong() {
        METERS_PER_DEGREE
    } else {
        1.0
    }
}

/// Extent covered by the full tile grid of one matrix.
fn matrix_bbox(res: f64, top_left: TopLeftCorner, tile_size: (u32, u32), grid_size: (u32, u32)) -> BoundingBox {
    let (tile_width, tile_height) = tile_size;
    let (cols, rows) = grid_size;
    let south = top_left.y - f64::from(tile_height) * res * f64::from(rows);
    let east = top_left.x + f64::from(tile_width) * res * f64::from(cols);
    BoundingBox::new(top_left.x, south, east, top_left.y).rounded(BBOX_DECIMALS)
}

/// Derive a [`Grid`] from a tile matrix set.
///
/// The bbox is computed from the last (finest) matrix only.
pub fn derive_grid(matrix_set: &TileMatrixSet) -> Result<Grid, TileMatrixError> {
    let srs = crs_to_srs(&matrix_set.crs)?;

    let first: &TileMatrix = matrix_set.tile_matrices.first().ok_or(TileMatrixError::Empty)?;
    let (_, prefix) = split_identifier(&first.id)
        .ok_or_else(|| TileMatrixError::NonNumericRange(first.id.clone()))?;

    let mut resolutions = Vec::with_capacity(matrix_set.tile_matrices.len());
    let mut bbox = None;

    for (index, tm) in matrix_set.tile_matrices.iter().enumerate() {
        let (number, tm_prefix) = split_identifier(&tm.id)
            .ok_or_else(|| TileMatrixError::NonNumericRange(tm.id.clone()))?;
        if number != index as u64 {
            return Err(TileMatrixError::NonNumericRange(tm.id.clone()));
        }
        if tm_prefix != prefix {
            return Err(TileMatrixError::AmbiguousPrefix(tm.id.clone()));
        }
        if tm.tile_size != first.tile_size {
            return Err(TileMatrixError::NonUniformTileSize(tm.id.clone()));
        }
        if tm.top_left != first.top_left {
            return Err(TileMatrixError::NonUniformTopLeft(tm.id.clone()));
        }

        let res = scale_to_res(tm.scale_denom, &srs);
        resolutions.push(res);
        bbox = Some(matrix_bbox(res, tm.top_left, tm.tile_size, tm.grid_size));
    }

    let bbox = bbox.ok_or(TileMatrixError::Empty)?;
    debug!(
        matrix_set = %matrix_set.id,
        srs = %srs,
        levels = resolutions.len(),
        "Derived grid"
    );

    Ok(Grid {
        name: mangle_name(&matrix_set.id),
        srs,
        tile_size: first.tile_size,
        resolutions,
        bbox,
        prefix: prefix.map(str::to_string),
        number_range: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_split_identifier() {
        assert_eq!(split_identifier("3"), Some((3, None)));
        assert_eq!(split_identifier("foo"), None);
        assert_eq!(split_identifier("foo3"), Some((3, Some("foo"))));
        assert_eq!(split_identifier("EPSG:4326:9"), Some((9, Some("EPSG:4326:"))));
        assert_eq!(split_identifier("L12"), Some((12, Some("L"))));
        assert_eq!(split_identifier("5.0E8"), Some((8, Some("5.0E"))));
        assert_eq!(split_identifier(""), None);
    }

    #[test]
    fn test_crs_to_srs() {
        assert_eq!(crs_to_srs("EPSG:4326").unwrap().epsg(), 4326);
        assert_eq!(crs_to_srs("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap().epsg(), 4326);
        assert_eq!(crs_to_srs("urn:ogc:def:crs:EPSG::900913").unwrap().epsg(), 900913);
        assert_eq!(crs_to_srs("urn:ogc:def:crs:EPSG:6.18:3:3857").unwrap().epsg(), 3857);
        assert_eq!(crs_to_srs("urn:ogc:def:crs:EPSG:6.3:25832").unwrap().epsg(), 25832);
    }

    #[test]
    fn test_crs_to_srs_rejects_unknown_formats() {
        for crs in [
            "urn:ogc:def:crs:OGC:1.3:CRS83",
            "urn:ogc:def:crs:EPSG::",
            "urn:ogc:def:crs:EPSG::abc",
            "http://www.opengis.net/def/crs/EPSG/0/3857",
            "EPSG:99999",
            "",
        ] {
            assert_eq!(
                crs_to_srs(crs),
                Err(TileMatrixError::UnsupportedCrs(crs.to_string())),
                "{}",
                crs
            );
        }
    }

    #[test]
    fn test_scale_to_res() {
        assert_approx_eq!(scale_to_res(1000.0, &Srs::from_epsg(3857).unwrap()), 0.28, 1e-12);
        assert_approx_eq!(
            scale_to_res(279541132.0143589, &Srs::wgs84()),
            0.703125,
            1e-9
        );
    }
}
