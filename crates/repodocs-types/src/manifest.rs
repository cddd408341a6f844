use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};

/// Tri-state override: unset falls back to the orchestrator's default,
/// `Some(true|false)` forces rendering on or off for one source.
pub type TriState = Option<bool>;

/// One source entry inside a [`Manifest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestSource {
    pub url: String,
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
    #[serde(default)]
    pub content_selector: Option<String>,
    #[serde(default)]
    pub exclude_selector: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub render_js: TriState,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Global options applying to every source in a [`Manifest`] unless
/// overridden per-source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestOptions {
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,
}

fn default_output() -> String {
    "./docs".to_string()
}

fn default_concurrency() -> usize {
    4
}

fn default_cache_ttl() -> String {
    "1h".to_string()
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            output: default_output(),
            concurrency: default_concurrency(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

/// Declarative batch specification of multiple sources, loaded from YAML or
/// JSON by `repodocs-manifest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub sources: Vec<ManifestSource>,
    #[serde(default)]
    pub options: ManifestOptions,
}
