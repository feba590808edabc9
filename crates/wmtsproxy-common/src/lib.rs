//! Common types and utilities shared across all wmtsproxy crates.

pub mod bbox;
pub mod error;
pub mod naming;

pub use bbox::BoundingBox;
pub use error::{ErrorDetail, ProxyError, ProxyResult};
pub use naming::{mangle_name, sanitize_identifier};
