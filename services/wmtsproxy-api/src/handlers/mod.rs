//! HTTP handlers.
//!
//! - [`check`] - layers of a capabilities document
//! - [`add`] - layer registration
//! - [`configs`] - generated proxy configurations
//! - [`health`] - health and Prometheus metrics
//! - [`common`] - JSON/JSONP responses and error mapping

pub mod add;
pub mod check;
pub mod common;
pub mod configs;
pub mod health;

pub use add::add_handler;
pub use check::check_handler;
pub use configs::{config_handler, configs_handler};
pub use health::{health_handler, metrics_handler};
