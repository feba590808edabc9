//! Spatial reference systems and coordinate transformations.
//!
//! Covers the reference systems tile grids are published in: geographic
//! WGS84 variants, spherical web mercator and UTM zones. Implemented from
//! the projection formulas without external dependencies.

pub mod mercator;
pub mod srs;
pub mod utm;

pub use srs::{is_supported_srs, Srs, SrsError, SrsKind};
pub use utm::TransverseMercator;
