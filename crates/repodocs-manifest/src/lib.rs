//! Manifest file parsing for batch runs over multiple sources. Dispatches
//! on file extension: `.json` decodes as JSON, everything else (`.yaml`,
//! `.yml`, or no extension) is tried as YAML.

use repodocs_types::{Manifest, RepodocsError, Result};
use std::path::Path;

/// Reads and parses a manifest file from disk.
pub fn load(path: &Path) -> Result<Manifest> {
    let bytes = std::fs::read(path)?;
    parse(&bytes, path.extension().and_then(|e| e.to_str()))
}

/// Parses manifest bytes already read from disk or another source. `ext`
/// selects the decoder; anything other than `"json"` is tried as YAML.
pub fn parse(bytes: &[u8], ext: Option<&str>) -> Result<Manifest> {
    let is_json = matches!(ext, Some(e) if e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_slice(bytes).map_err(|e| RepodocsError::InvalidManifest(e.to_string()))
    } else {
        serde_yaml::from_slice(bytes).map_err(|e| RepodocsError::InvalidManifest(e.to_string()))
    }
}
