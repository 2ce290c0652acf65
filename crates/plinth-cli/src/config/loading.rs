use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml, Yaml},
    value::{Dict, Value},
};
use serde::Serialize;

use crate::cli::{BuildArgs, BundleArgs, Loader, LoaderKind};
use crate::config::PlinthConfig;
use crate::error::{ConfigError, Result};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "plinth.config.json";

const ENV_PREFIX: &str = "PLINTH_";

/// Values given explicitly on the command line. Unset flags are not serialized,
/// so they never mask lower-priority sources.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader: Option<Loader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub loaders: BTreeMap<String, LoaderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

impl From<&BuildArgs> for CliOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self {
            dist: args.dist.clone(),
            debug: args.debug.then_some(true),
            reload: args.reload.then_some(true),
            info: args.info.then_some(true),
            import_map: args.import_map.clone(),
            loader: args.loader,
            cache_dir: args.cache_dir.clone(),
            loaders: args.file_loaders.iter().cloned().collect(),
            debounce_ms: None,
        }
    }
}

impl From<&BundleArgs> for CliOverrides {
    fn from(args: &BundleArgs) -> Self {
        Self {
            debounce_ms: args.debounce_ms,
            ..Default::default()
        }
    }
}

impl PlinthConfig {
    /// Load configuration for `plinth build`.
    pub fn load_for_build(args: &BuildArgs) -> Result<Self> {
        Self::load(args.config.as_deref(), Path::new("."), &CliOverrides::from(args))
    }

    /// Load configuration for `plinth bundle`.
    pub fn load_for_bundle(args: &BundleArgs) -> Result<Self> {
        Self::load(args.config.as_deref(), Path::new("."), &CliOverrides::from(args))
    }

    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    pub(crate) fn load(
        config_path: Option<&Path>,
        cwd: &Path,
        overrides: &CliOverrides,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = cwd.join(DEFAULT_CONFIG_FILE);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("toml") => figment.merge(Toml::file(path)),
                _ => figment.merge(Json::file(path)),
            };
        }

        // PLINTH_CACHE_DIR -> cacheDir, PLINTH_DEBOUNCE_MS -> debounceMs, ...
        figment = figment.merge(Serialized::defaults(env_overrides()));
        figment = figment.merge(Serialized::defaults(overrides));

        figment
            .extract()
            .map_err(|e| ConfigError::Extract(e.to_string()).into())
    }
}

/// Collect `PLINTH_*` variables under their camelCase config keys.
fn env_overrides() -> Dict {
    Env::prefixed(ENV_PREFIX)
        .iter()
        .map(|(key, value)| {
            let value = Value::from_str(&value).unwrap_or_else(|never| match never {});
            (env_key_to_camel(key.as_str()), value)
        })
        .collect()
}

/// `CACHE_DIR` -> `cacheDir`.
pub(crate) fn env_key_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}
