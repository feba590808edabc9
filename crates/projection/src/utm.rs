//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! ETRS89 zones (EPSG:258xx) use GRS80 which differs from WGS84 by far less
//! than a tile pixel, so both share this implementation.
//!
//! Series expansions follow Snyder, "Map Projections: A Working Manual",
//! equations 8-9 to 8-25.

/// WGS84 semi-major axis (meters)
const WGS84_A: f64 = 6378137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257223563;
/// UTM scale factor on the central meridian
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500000.0;
const FALSE_NORTHING_SOUTH: f64 = 10000000.0;

/// Transverse mercator parameters for one UTM zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Zone number (1-60)
    pub zone: u8,
    /// Southern hemisphere (false northing applied)
    pub south: bool,
    /// Central meridian in degrees
    pub lon0: f64,
}

impl TransverseMercator {
    /// Create the projection for a UTM zone.
    pub fn utm(zone: u8, south: bool) -> Self {
        Self {
            zone,
            south,
            lon0: zone as f64 * 6.0 - 183.0,
        }
    }

    fn e2() -> f64 {
        WGS84_F * (2.0 - WGS84_F)
    }

    /// Meridian arc length from the equator to latitude `phi` (radians).
    fn meridian_arc(phi: f64) -> f64 {
        let e2 = Self::e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Convert geographic coordinates (degrees) to easting/northing (meters).
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let e2 = Self::e2();
        let ep2 = e2 / (1.0 - e2);
        let phi = lat_deg.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();

        let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lon_deg - self.lon0).to_radians();
        let m = Self::meridian_arc(phi);

        let x = K0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
            + FALSE_EASTING;

        let mut y = K0
            * (m + n
                * phi.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        if self.south {
            y += FALSE_NORTHING_SOUTH;
        }

        (x, y)
    }

    /// Convert easting/northing (meters) to geographic (lon, lat in degrees).
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = Self::e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let x = x - FALSE_EASTING;
        let y = if self.south {
            y - FALSE_NORTHING_SOUTH
        } else {
            y
        };

        // Footpoint latitude
        let m = y / K0;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        let tan_phi1 = phi1.tan();
        let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
        let t1 = tan_phi1 * tan_phi1;
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
        let d = x / (n1 * K0);

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
                / 120.0)
            / cos_phi1;

        (self.lon0 + lon.to_degrees(), lat.to_degrees())
    }
}
