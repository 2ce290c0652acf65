//! Plugin manifests: parsing, staged resolution and artifact output.

mod import_cache;
mod loader;
mod stage;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::DEFAULT_SYMBOL;
use crate::resolve::CustomLoader;
use crate::{Error, Result};

pub use import_cache::{ImportCache, cache_key};
pub use loader::{BuildReport, ManifestLoader};
pub use stage::{
    AssetPatterns, AssetsResolved, CompiledDependencies, CompiledFunctions, DependenciesResolved,
    DependencyLocators, FunctionSources, ImportLocators, ImportsResolved, Manifest, Named,
    ResolvedImports, ResolvedManifest, Stage,
};

/// Default directory for cached import manifests.
pub const DEFAULT_CACHE_DIR: &str = ".plinth-cache";

/// Manifest as written by the plugin author.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub functions: IndexMap<String, FunctionDef>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ManifestDocument {
    /// Parse YAML (or JSON) manifest text.
    pub fn parse(source: &str, origin: &Path) -> Result<Self> {
        let invalid = |message: String| Error::InvalidManifest {
            path: origin.display().to_string(),
            message,
        };
        let value: Value = serde_saphyr::from_str(source).map_err(|e| invalid(e.to_string()))?;
        if !value.is_object() {
            return Err(invalid("top level must be a mapping".to_string()));
        }
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
    }
}

/// One entry of the `functions` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// `file[:symbol]`, removed once compiled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Host-specific keys (events, commands, ...), passed through untouched.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Split `file[:symbol]` into the file and the exported symbol.
///
/// The split happens at the last `:` only when what follows is an identifier and
/// what precedes it is non-empty; otherwise the symbol is `default`.
pub fn parse_function_path(raw: &str) -> (&str, &str) {
    if let Some((file, symbol)) = raw.rsplit_once(':') {
        if !file.is_empty() && is_identifier(symbol) {
            return (file, symbol);
        }
    }
    (raw, DEFAULT_SYMBOL)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Options shared by every manifest build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Disable minification.
    pub debug: bool,
    /// Refetch imported manifests instead of using the cache.
    pub reload: bool,
    /// Log a summary of each artifact after building it.
    pub info: bool,
    pub import_map: Option<String>,
    pub custom_loaders: IndexMap<String, CustomLoader>,
    pub cache_dir: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            debug: false,
            reload: false,
            info: false,
            import_map: None,
            custom_loaders: IndexMap::new(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// Artifact path for a manifest: its file name with the extension replaced by `json`.
pub fn artifact_path(manifest: &Path, out_dir: &Path) -> PathBuf {
    let file_name = manifest
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("manifest"));
    out_dir.join(file_name.with_extension("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_path() {
        assert_eq!(parse_function_path("./greet.ts:sayHi"), ("./greet.ts", "sayHi"));
        assert_eq!(parse_function_path("./greet.ts"), ("./greet.ts", "default"));
        assert_eq!(parse_function_path("a:b:c"), ("a:b", "c"));
        // Windows drive letters and URLs keep their colon.
        assert_eq!(parse_function_path("C:\\plugs\\x.ts"), ("C:\\plugs\\x.ts", "default"));
        assert_eq!(
            parse_function_path("https://cdn.example/x.ts"),
            ("https://cdn.example/x.ts", "default")
        );
        assert_eq!(parse_function_path(":sayHi"), (":sayHi", "default"));
    }

    #[test]
    fn test_artifact_path_replaces_extension() {
        assert_eq!(
            artifact_path(Path::new("plugs/demo.plug.yaml"), Path::new("dist")),
            PathBuf::from("dist/demo.plug.json")
        );
    }

    #[test]
    fn test_parse_yaml_preserves_unknown_keys() {
        let doc = ManifestDocument::parse(
            "name: demo\nversion: 3\nfunctions:\n  greet:\n    path: ./greet.ts:sayHi\n    command: Say hi\n",
            Path::new("demo.plug.yaml"),
        )
        .unwrap();

        assert_eq!(doc.name.as_deref(), Some("demo"));
        assert_eq!(doc.extra["version"], 3);
        let greet = &doc.functions["greet"];
        assert_eq!(greet.path.as_deref(), Some("./greet.ts:sayHi"));
        assert_eq!(greet.extra["command"], "Say hi");
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = ManifestDocument::parse("- a\n- b\n", Path::new("list.yaml")).unwrap_err();
        assert!(matches!(err, Error::InvalidManifest { .. }));
    }

    #[test]
    fn test_parse_accepts_json() {
        let doc = ManifestDocument::parse(
            r#"{"name": "demo", "assets": ["*.svg"]}"#,
            Path::new("demo.json"),
        )
        .unwrap();
        assert_eq!(doc.assets, vec!["*.svg".to_string()]);
    }
}
