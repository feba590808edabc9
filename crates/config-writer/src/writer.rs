//! YAML output of generated configurations.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;
use wmtsproxy_common::{ProxyError, ProxyResult};

use crate::mapproxy::MapProxyConfig;

/// Serialize a configuration as block-style YAML.
pub fn to_yaml(config: &MapProxyConfig) -> ProxyResult<String> {
    serde_yaml::to_string(config)
        .map_err(|e| ProxyError::service("Serializing configuration failed").with_cause(e))
}

/// Write a configuration to `path`.
///
/// The file is written next to its destination and renamed into place, so
/// readers see either the old or the complete new content.
pub fn write_config(config: &MapProxyConfig, path: &Path) -> ProxyResult<String> {
    let yaml = to_yaml(config)?;
    let write_failed = |e: std::io::Error| {
        ProxyError::service("Writing configuration failed")
            .with_cause(format!("{}: {}", path.display(), e))
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(yaml.as_bytes()).map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    debug!(path = %path.display(), bytes = yaml.len(), "Wrote configuration");
    Ok(yaml)
}
