//! Function compiler.
//!
//! Turns one exported function (or a whole module) into a self-contained script
//! that evaluates to the exported value. Each compile runs one build engine
//! invocation with a fresh [`ModuleResolver`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::Instrument;
use url::Url;

use crate::engine::{BuildEngine, EngineRequest};
use crate::fetch::{Fetcher, parse_absolute_url};
use crate::resolve::{
    CustomLoader, DenoInfoOracle, LoaderStrategy, ModuleGraphOracle, ModuleLoader, ModuleResolver,
    OracleLoader, PortableLoader, ResolverOptions,
};
use crate::{Error, Result};

/// Global the compiled IIFE assigns its exports to.
pub const EXPORT_BINDING: &str = "__plinth_export";

/// Import map picked up from the working directory when none is configured.
pub const DEFAULT_IMPORT_MAP: &str = "import_map.json";

/// Symbol name meaning "the module's default export".
pub const DEFAULT_SYMBOL: &str = "default";

/// Per-compile options.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Disables minification.
    pub debug: bool,
    /// Specifier prefixes left unresolved in the output.
    pub externals: Vec<String>,
    /// Import map locator; falls back to [`DEFAULT_IMPORT_MAP`] in the working directory.
    pub import_map: Option<String>,
    /// Extension (with leading dot) to custom loader.
    pub custom_loaders: IndexMap<String, CustomLoader>,
}

/// Compiles functions and modules through a [`BuildEngine`].
#[derive(Debug, Clone)]
pub struct Compiler {
    engine: Arc<dyn BuildEngine>,
    fetcher: Arc<dyn Fetcher>,
    oracle: Arc<dyn ModuleGraphOracle>,
    strategy: LoaderStrategy,
    cwd: PathBuf,
}

impl Compiler {
    pub fn new(engine: Arc<dyn BuildEngine>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            engine,
            fetcher,
            oracle: Arc::new(DenoInfoOracle::default()),
            strategy: LoaderStrategy::default(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_strategy(mut self, strategy: LoaderStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn ModuleGraphOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Working directory used for the default import map and the engine.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn strategy(&self) -> LoaderStrategy {
        self.strategy
    }

    fn new_loader(&self) -> Arc<dyn ModuleLoader> {
        match self.strategy {
            LoaderStrategy::Oracle => Arc::new(OracleLoader::new(Arc::clone(&self.oracle))),
            LoaderStrategy::Portable => Arc::new(PortableLoader::new(Arc::clone(&self.fetcher))),
        }
    }

    /// Import map locator for one compile, relative paths taken from the working
    /// directory rather than the directory of the compiled file.
    async fn import_map(&self, options: &CompileOptions) -> Result<Option<String>> {
        if let Some(locator) = &options.import_map {
            if parse_absolute_url(locator).is_some() {
                return Ok(Some(locator.clone()));
            }
            let path = std::path::absolute(self.cwd.join(locator))
                .map_err(|e| Error::io_at("resolve import map", Path::new(locator), e))?;
            return Ok(Some(path.to_string_lossy().into_owned()));
        }
        let default = self.cwd.join(DEFAULT_IMPORT_MAP);
        match tokio::fs::try_exists(&default).await {
            Ok(true) => Ok(Some(default.to_string_lossy().into_owned())),
            _ => Ok(None),
        }
    }

    /// Compile `source_file`, or only `exported_symbol` from it, into a wrapped script.
    pub async fn compile(
        &self,
        source_file: &Path,
        exported_symbol: Option<&str>,
        options: &CompileOptions,
    ) -> Result<String> {
        let span = tracing::debug_span!(
            "compile",
            file = %source_file.display(),
            symbol = exported_symbol.unwrap_or("*")
        );

        async move {
            let source_file = std::path::absolute(source_file)
                .map_err(|e| Error::io_at("resolve", source_file, e))?;
            let resolve_dir = source_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.cwd.clone());

            let Some(symbol) = exported_symbol else {
                return self.bundle(&source_file, &resolve_dir, options).await;
            };

            let url = Url::from_file_path(&source_file).map_err(|_| Error::Resolution {
                specifier: source_file.display().to_string(),
                referrer: String::new(),
                message: "not an absolute path".to_string(),
            })?;
            // Dropping `entry` deletes the file on every exit path.
            let entry = write_entry(&entry_source(symbol, url.as_str())).await?;
            self.bundle(entry.path(), &resolve_dir, options).await
        }
        .instrument(span)
        .await
    }

    /// Compile a whole module as an importable unit (`export * from "<url>"`).
    pub async fn compile_module(
        &self,
        cwd: &Path,
        module_locator: &str,
        options: &CompileOptions,
    ) -> Result<String> {
        let url = match parse_absolute_url(module_locator) {
            Some(url) => url,
            None => {
                let path = std::path::absolute(cwd.join(module_locator))?;
                Url::from_file_path(&path).map_err(|_| Error::Resolution {
                    specifier: module_locator.to_string(),
                    referrer: cwd.display().to_string(),
                    message: "not a valid module path".to_string(),
                })?
            }
        };

        let entry = write_entry(&format!("export * from {};\n", js_string(url.as_str()))).await?;
        tracing::debug!(module = %url, "compiling module");
        self.bundle(entry.path(), cwd, options).await
    }

    /// Compile in-memory source text, staged in a throwaway directory.
    pub async fn sandbox_compile(
        &self,
        filename: &str,
        source: &str,
        exported_symbol: Option<&str>,
        options: &CompileOptions,
    ) -> Result<String> {
        let dir = tempfile::Builder::new().prefix("plinth-sandbox-").tempdir()?;
        let path = dir.path().join(filename);
        tokio::fs::write(&path, source)
            .await
            .map_err(|e| Error::io_at("write", &path, e))?;

        let result = self.compile(&path, exported_symbol, options).await;
        drop(dir);
        result
    }

    async fn bundle(
        &self,
        entry: &Path,
        resolve_dir: &Path,
        options: &CompileOptions,
    ) -> Result<String> {
        let resolver = ModuleResolver::new(
            ResolverOptions {
                resolve_dir: resolve_dir.to_path_buf(),
                import_map: self.import_map(options).await?,
                externals: options.externals.clone(),
                custom_loaders: options.custom_loaders.clone(),
            },
            Arc::clone(&self.fetcher),
            self.new_loader(),
        );

        let output = self
            .engine
            .build(EngineRequest {
                entry: entry.to_path_buf(),
                cwd: self.cwd.clone(),
                global_name: EXPORT_BINDING.to_string(),
                minify: !options.debug,
                resolver: Arc::new(resolver),
            })
            .await?;

        tracing::debug!(
            bytes = output.code.len(),
            watched = output.watch_files.len(),
            "engine finished"
        );
        Ok(wrap(&patch(&output.code)))
    }
}

/// Entry module importing exactly `symbol` from `url` and re-exporting it as default.
fn entry_source(symbol: &str, url: &str) -> String {
    if symbol == DEFAULT_SYMBOL {
        format!("import mod from {};\nexport default mod;\n", js_string(url))
    } else {
        format!(
            "import {{ {symbol} }} from {};\nexport default {symbol};\n",
            js_string(url)
        )
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

/// Temporary entry in the system temp dir, removed when the handle drops.
async fn write_entry(source: &str) -> Result<tempfile::NamedTempFile> {
    let entry = tempfile::Builder::new()
        .prefix("plinth-entry-")
        .suffix(".ts")
        .tempfile()?;
    tokio::fs::write(entry.path(), source)
        .await
        .map_err(|e| Error::io_at("write", entry.path(), e))?;
    Ok(entry)
}

/// Replace the lookbehind regex literal some hosts reject.
pub fn patch(script: &str) -> String {
    script.replace("/(?<=\\n)/", "/()/")
}

/// Wrap an IIFE build so evaluating it yields the exported value.
pub fn wrap(script: &str) -> String {
    format!("(() => {{ {}\nreturn {};}})()", script, EXPORT_BINDING)
}
