//! Spherical (web) mercator, EPSG:3857 and its aliases.

use std::f64::consts::PI;

/// Radius of the sphere used by web mercator (WGS84 semi-major axis).
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Half the circumference, the x/y extent of the square world.
pub const ORIGIN_SHIFT: f64 = 20037508.342789244;

/// Maximum latitude representable on the square world.
pub const MAX_LATITUDE: f64 = 85.0511287798066;

/// Convert web mercator (meters) to WGS84 (lon, lat in degrees).
pub fn to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x / ORIGIN_SHIFT * 180.0;
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Convert WGS84 (lon, lat in degrees) to web mercator meters.
///
/// Latitudes beyond the square world are clamped.
pub fn from_wgs84(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon / 180.0 * ORIGIN_SHIFT;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

/// Resolutions (meters/pixel) of the global web mercator tile grid.
///
/// Level 0 is a single 256px tile covering the square world.
pub fn global_resolutions(num_levels: usize) -> Vec<f64> {
    let res0 = 2.0 * ORIGIN_SHIFT / 256.0;
    (0..num_levels).map(|z| res0 / 2f64.powi(z as i32)).collect()
}

/// Level of the global web mercator grid whose resolution is closest to `res`.
///
/// Distance is measured on a log scale, ties resolve to the coarser level.
pub fn closest_level(res: f64, num_levels: usize) -> usize {
    if res.is_nan() || res <= 0.0 {
        return num_levels.saturating_sub(1);
    }

    let target = res.ln();
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (level, level_res) in global_resolutions(num_levels).into_iter().enumerate() {
        let diff = (level_res.ln() - target).abs();
        if diff < best_diff {
            best = level;
            best_diff = diff;
        }
    }
    best
}
