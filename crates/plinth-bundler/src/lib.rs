#![cfg_attr(docsrs, feature(doc_cfg))]

//! # plinth-bundler
//!
//! Manifest-driven plugin builds on top of Rolldown.
//!
//! A plugin is described by a manifest (`*.plug.yaml`) declaring its exported
//! functions, static assets, runtime dependencies and imported plugins. This crate
//! turns such a manifest into a single JSON artifact in which every function is a
//! self-contained script, every dependency is pre-compiled and every asset is inlined.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plinth_bundler::{
//!     BuildOptions, BuildOrchestrator, Compiler, HttpFetcher, ManifestLoader, RolldownEngine,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Arc::new(HttpFetcher::new());
//! let compiler = Compiler::new(Arc::new(RolldownEngine::new()), fetcher.clone());
//! let loader = ManifestLoader::new(Arc::new(compiler), fetcher, BuildOptions::default());
//!
//! let orchestrator = BuildOrchestrator::new(loader);
//! if let Some(report) = orchestrator
//!     .build_all(&["plugs/demo.plug.yaml".into()], "dist".as_ref())
//!     .await?
//! {
//!     println!("{} built, {} failed", report.built.len(), report.failed.len());
//! }
//! # Ok(()) }
//! ```

pub mod assets;
pub mod compiler;
pub mod engine;
pub mod fetch;
pub mod manifest;
pub mod orchestrator;
pub mod resolve;
pub mod watch;

pub use assets::{AssetBundle, bundle_assets, bundle_folder};
pub use compiler::{CompileOptions, Compiler, EXPORT_BINDING};
pub use engine::{BuildEngine, EngineOutput, EngineRequest, RolldownEngine};
pub use fetch::{Fetched, Fetcher, HttpFetcher};
pub use manifest::{
    BuildOptions, BuildReport, ImportCache, Manifest, ManifestDocument, ManifestLoader,
    ResolvedManifest, Stage,
};
pub use orchestrator::{BatchReport, BuildFailure, BuildOrchestrator, watch_folder};
pub use resolve::{
    CustomLoader, DenoInfoOracle, ImportMap, LoaderStrategy, ModuleGraphOracle, ModuleLoader,
    ModuleResolver, Resolved,
};
pub use watch::{ChangeEvent, ChangeKind, FileWatcher};

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogConfig, LogLevel, init_logging, init_logging_from_env};

/// Error types for plinth-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required manifest field is absent.
    #[error("Manifest {path} is missing required field `{field}`")]
    MissingField { path: String, field: &'static str },

    /// The manifest document could not be parsed or has the wrong shape.
    #[error("Invalid manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An asset glob pattern failed to compile.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    /// A specifier could not be turned into a module identity.
    #[error("Cannot resolve '{specifier}' from {referrer}: {message}")]
    Resolution {
        specifier: String,
        referrer: String,
        message: String,
    },

    /// The import map could not be fetched or parsed.
    #[error("Failed to load import map {locator}: {message}")]
    ImportMap { locator: String, message: String },

    /// The module-graph oracle failed or reported an error for a module.
    #[error("Module graph oracle failed for {url}: {message}")]
    Oracle { url: String, message: String },

    /// The oracle knows the module but it has no local copy.
    #[error("Module {url} has not been materialized locally")]
    NotMaterialized { url: String },

    /// Error from the build engine.
    #[error("Build engine error: {0}")]
    Engine(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file watcher could not be set up.
    #[error("Watch error: {0}")]
    Watch(String),

    /// A network fetch failed.
    #[error("Failed to fetch {url}: {message}")]
    Network { url: String, message: String },
}

/// Result type alias for plinth-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error with the operation and path that triggered it.
    pub fn io_at(action: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        Error::IoError {
            message: format!("Failed to {} {}: {}", action, path.display(), source),
            source,
        }
    }

    /// Create an engine error from a Rolldown diagnostic batch.
    ///
    /// The batch names the failing module; `causes` are the resolver's own
    /// messages, which Rolldown replaces with the name of the failing plugin.
    pub fn from_rolldown_batch(batch: &dyn std::fmt::Display, causes: &[String]) -> Self {
        let mut message = batch.to_string();
        for cause in causes {
            if !message.contains(cause.as_str()) {
                message.push_str("\n  caused by: ");
                message.push_str(cause);
            }
        }
        Error::Engine(message)
    }
}

impl From<notify::Error> for Error {
    fn from(error: notify::Error) -> Self {
        Error::Watch(error.to_string())
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::MissingField { .. } => "MISSING_FIELD",
            Error::InvalidManifest { .. } => "INVALID_MANIFEST",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Glob { .. } => "INVALID_GLOB",
            Error::Resolution { .. } => "RESOLUTION_ERROR",
            Error::ImportMap { .. } => "IMPORT_MAP_ERROR",
            Error::Oracle { .. } => "ORACLE_ERROR",
            Error::NotMaterialized { .. } => "NOT_MATERIALIZED",
            Error::Engine(_) => "ENGINE_ERROR",
            Error::Io(_) | Error::IoError { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Watch(_) => "WATCH_ERROR",
            Error::Network { .. } => "NETWORK_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::MissingField { field, .. } => Some(Box::new(format!(
                "Add a `{}` entry at the top level of the manifest.",
                field
            ))),
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check your configuration file for syntax errors.\nError: {}",
                msg
            ))),
            Error::Glob { .. } => Some(Box::new(
                "Asset patterns use glob syntax relative to the manifest directory, e.g. `assets/*.svg`.",
            )),
            Error::ImportMap { .. } => Some(Box::new(
                "Import maps are JSON documents with `imports` and optional `scopes` objects.",
            )),
            Error::NotMaterialized { url } => Some(Box::new(format!(
                "The module graph oracle has no local copy of {}. Check that the URL is reachable.",
                url
            ))),
            Error::Network { .. } => Some(Box::new(
                "Check your network connection, or rebuild without --reload to use cached imports.",
            )),
            _ => None,
        }
    }
}
