//! Module loading strategies.
//!
//! A [`ModuleLoader`] turns a canonical module URL into source text plus a module
//! kind. Two interchangeable strategies exist: [`OracleLoader`] asks an external
//! module-graph describer for a local copy, [`PortableLoader`] reads and fetches
//! directly.

mod oracle;
mod portable;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;

pub use oracle::{DenoInfoOracle, ModuleGraph, ModuleGraphOracle, ModuleRecord, OracleLoader};
pub use portable::PortableLoader;

/// Source language of a loaded module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
}

impl ModuleKind {
    /// Classify by file extension, `None` when the extension says nothing.
    pub fn from_extension(path: &str) -> Option<Self> {
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("ts") | Some("mts") | Some("cts") => Some(Self::Ts),
            Some("tsx") => Some(Self::Tsx),
            Some("jsx") => Some(Self::Jsx),
            Some("json") => Some(Self::Json),
            Some("js") | Some("mjs") | Some("cjs") => Some(Self::Js),
            _ => None,
        }
    }

    /// Classify by a module-graph media type such as `TypeScript` or `Dts`.
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type {
            "TypeScript" | "Mts" | "Cts" | "Dts" | "Dmts" | "Dcts" => Self::Ts,
            "TSX" | "Tsx" => Self::Tsx,
            "JSX" | "Jsx" => Self::Jsx,
            "Json" => Self::Json,
            _ => Self::Js,
        }
    }

    /// Classify by an HTTP content type.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim();
        match essence {
            "application/typescript" | "text/typescript" | "video/mp2t"
            | "application/x-typescript" => Some(Self::Ts),
            "text/tsx" => Some(Self::Tsx),
            "text/jsx" => Some(Self::Jsx),
            "application/json" | "text/json" => Some(Self::Json),
            "application/javascript" | "text/javascript" | "application/ecmascript"
            | "text/ecmascript" => Some(Self::Js),
            _ => None,
        }
    }
}

/// Source text of a module ready for the build engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    pub code: String,
    pub kind: ModuleKind,
    /// Local file the content came from, recorded as a watch dependency.
    pub watch: Option<PathBuf>,
}

impl LoadedModule {
    pub fn new(code: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            code: code.into(),
            kind,
            watch: None,
        }
    }

    pub fn watching(mut self, path: PathBuf) -> Self {
        self.watch = Some(path);
        self
    }
}

/// Strategy selecting how modules are loaded, chosen once by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderStrategy {
    /// Ask a module-graph oracle (`deno info`) for locally materialized modules.
    Oracle,
    /// Read local files and fetch remote modules directly.
    #[default]
    Portable,
}

impl std::str::FromStr for LoaderStrategy {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oracle" | "deno" => Ok(Self::Oracle),
            "portable" => Ok(Self::Portable),
            other => Err(format!("Invalid loader strategy: {}", other)),
        }
    }
}

impl std::fmt::Display for LoaderStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oracle => write!(f, "oracle"),
            Self::Portable => write!(f, "portable"),
        }
    }
}

/// Loads module content for a canonical URL.
#[async_trait]
pub trait ModuleLoader: Send + Sync + Debug {
    async fn load(&self, url: &Url) -> Result<LoadedModule>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ModuleKind::from_extension("a/b.ts"), Some(ModuleKind::Ts));
        assert_eq!(ModuleKind::from_extension("b.tsx"), Some(ModuleKind::Tsx));
        assert_eq!(ModuleKind::from_extension("b.mjs"), Some(ModuleKind::Js));
        assert_eq!(ModuleKind::from_extension("b.json"), Some(ModuleKind::Json));
        assert_eq!(ModuleKind::from_extension("mod"), None);
    }

    #[test]
    fn test_kind_from_media_type() {
        assert_eq!(ModuleKind::from_media_type("TypeScript"), ModuleKind::Ts);
        assert_eq!(ModuleKind::from_media_type("Dts"), ModuleKind::Ts);
        assert_eq!(ModuleKind::from_media_type("TSX"), ModuleKind::Tsx);
        assert_eq!(ModuleKind::from_media_type("JavaScript"), ModuleKind::Js);
        assert_eq!(ModuleKind::from_media_type("Unknown"), ModuleKind::Js);
    }

    #[test]
    fn test_kind_from_content_type() {
        assert_eq!(
            ModuleKind::from_content_type("application/typescript; charset=utf-8"),
            Some(ModuleKind::Ts)
        );
        assert_eq!(ModuleKind::from_content_type("text/html"), None);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("oracle".parse::<LoaderStrategy>().unwrap(), LoaderStrategy::Oracle);
        assert_eq!("deno".parse::<LoaderStrategy>().unwrap(), LoaderStrategy::Oracle);
        assert_eq!(
            "PORTABLE".parse::<LoaderStrategy>().unwrap(),
            LoaderStrategy::Portable
        );
        assert!("esm".parse::<LoaderStrategy>().is_err());
    }
}
