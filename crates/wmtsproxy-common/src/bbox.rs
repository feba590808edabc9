//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole WGS84 coordinate space.
    pub fn world_wgs84() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Build from OWS `LowerCorner` / `UpperCorner` texts ("x y").
    pub fn from_corners(lower: &str, upper: &str) -> Result<Self, BboxParseError> {
        let (min_x, min_y) = parse_pair(lower)?;
        let (max_x, max_y) = parse_pair(upper)?;
        Ok(Self::new(min_x, min_y, max_x, max_y))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether min < max on both axes.
    pub fn is_ordered(&self) -> bool {
        self.min_x < self.max_x && self.min_y < self.max_y
    }

    /// Per-axis intersection without an overlap check.
    ///
    /// Disjoint boxes yield an inverted result.
    pub fn clip_to(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        }
    }

    /// Round every coordinate to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> BoundingBox {
        let factor = 10f64.powi(decimals);
        let round = |v: f64| (v * factor).round() / factor;
        BoundingBox {
            min_x: round(self.min_x),
            min_y: round(self.min_y),
            max_x: round(self.max_x),
            max_y: round(self.max_y),
        }
    }

    /// `[minx, miny, maxx, maxy]`, the list form used in configuration files.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

fn parse_pair(s: &str) -> Result<(f64, f64), BboxParseError> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(BboxParseError::InvalidFormat(s.to_string()));
    }
    let x = parts[0]
        .parse()
        .map_err(|_| BboxParseError::InvalidNumber(parts[0].to_string()))?;
    let y = parts[1]
        .parse()
        .map_err(|_| BboxParseError::InvalidNumber(parts[1].to_string()))?;
    Ok((x, y))
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid corner format: {0}. Expected 'x y'")]
    InvalidFormat(String),

    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners() {
        let bbox = BoundingBox::from_corners("-180.0 -90.0", "180.0 83.624").unwrap();
        assert_eq!(bbox.to_array(), [-180.0, -90.0, 180.0, 83.624]);
    }

    #[test]
    fn test_clip_to_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(a.clip_to(&b).to_array(), [5.0, 5.0, 10.0, 10.0]);
        assert_eq!(b.clip_to(&a), a.clip_to(&b));
    }

    #[test]
    fn test_rounded() {
        let bbox = BoundingBox::new(-180.000000001, -90.0, 179.999999999, 90.123456789);
        assert_eq!(bbox.rounded(8).to_array(), [-180.0, -90.0, 180.0, 90.12345679]);
    }
}
