//! Shared test utilities for the wmtsproxy workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers
//! - Capabilities document fixtures
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, load_fixture};
//! ```

pub mod fixtures;
pub mod paths;

pub use fixtures::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of coordinate pairs.
///
/// ```ignore
/// use test_utils::assert_coords_approx_eq;
///
/// assert_coords_approx_eq!((1.0001, 2.0001), (1.0, 2.0), 0.001);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    ($left:expr, ($x2:expr, $y2:expr), $epsilon:expr) => {{
        let (x1, y1) = $left;
        $crate::assert_approx_eq!(x1, $x2, $epsilon);
        $crate::assert_approx_eq!(y1, $y2, $epsilon);
    }};
}

/// Macro for element-wise approximate equality of bbox arrays.
#[macro_export]
macro_rules! assert_bbox_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: [f64; 4] = $left;
        let right: [f64; 4] = $right;
        for i in 0..4 {
            $crate::assert_approx_eq!(left[i], right[i], $epsilon);
        }
    }};
}
