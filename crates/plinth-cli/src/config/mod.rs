//! Configuration system for Plinth with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and config files.
//! Priority: CLI > Environment > File > Defaults

mod conversions;
mod defaults;
mod loading;
mod validation;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::{Loader, LoaderKind};

pub use defaults::*;
pub use loading::DEFAULT_CONFIG_FILE;

/// Plinth configuration - loaded from plinth.config.json, `PLINTH_*` variables and CLI args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlinthConfig {
    /// Output directory for manifest artifacts
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    /// Skip minification
    #[serde(default)]
    pub debug: bool,

    /// Refetch imported manifests instead of using the cache
    #[serde(default)]
    pub reload: bool,

    /// Print a summary of each artifact
    #[serde(default)]
    pub info: bool,

    /// Import map locator (path or URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_map: Option<String>,

    /// Module loading strategy (oracle or portable)
    #[serde(default)]
    pub loader: Loader,

    /// Directory for cached imported manifests
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Deno executable used by the oracle loader
    #[serde(default = "default_deno_path")]
    pub deno_path: PathBuf,

    /// Extension (with leading dot) to loader kind, e.g. {".txt": "text"}
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub loaders: BTreeMap<String, LoaderKind>,

    /// Extra ignore patterns for watch mode (`*.ext` suffixes or path segments)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_ignore: Vec<String>,

    /// Quiet period before rebundling a watched folder, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for PlinthConfig {
    fn default() -> Self {
        Self {
            dist: default_dist(),
            debug: false,
            reload: false,
            info: false,
            import_map: None,
            loader: Loader::default(),
            cache_dir: default_cache_dir(),
            deno_path: default_deno_path(),
            loaders: BTreeMap::new(),
            watch_ignore: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl PlinthConfig {
    /// Generate JSON Schema for plinth.config.json.
    pub fn json_schema() -> serde_json::Value {
        serde_json::Value::from(schemars::schema_for!(PlinthConfig))
    }
}
