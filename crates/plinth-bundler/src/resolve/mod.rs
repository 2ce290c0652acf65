//! Module resolution for the build engine.
//!
//! [`ModuleResolver`] holds the per-invocation state behind the engine's resolve
//! and load hooks: the external prefix list, the custom per-extension loaders,
//! the lazily loaded import map and the chosen [`ModuleLoader`].

mod import_map;
pub mod loader;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use url::Url;

use crate::fetch::{Fetcher, file_url_to_path, parse_absolute_url};
use crate::{Error, Result};

pub use import_map::ImportMap;
pub use loader::{
    DenoInfoOracle, LoadedModule, LoaderStrategy, ModuleGraphOracle, ModuleKind, ModuleLoader,
    OracleLoader, PortableLoader,
};

/// Outcome of the resolve hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Left as an unresolved reference in the output.
    External(String),
    /// Bare path served by a custom per-extension loader.
    Path(PathBuf),
    /// Canonical module URL served by this resolver's load hook.
    Module(Url),
}

/// Loader for non-code file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomLoader {
    /// `export default "<file contents>"`
    Text,
    /// `export default "<base64 of file contents>"`
    Base64,
    /// The file parsed as a JSON module.
    Json,
}

impl std::str::FromStr for CustomLoader {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "base64" => Ok(Self::Base64),
            "json" => Ok(Self::Json),
            other => Err(format!("Invalid loader: {}", other)),
        }
    }
}

/// Static configuration of one resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Directory relative specifiers of the entry resolve against.
    pub resolve_dir: PathBuf,
    /// Import map locator, fetched once on first resolve. A relative path joins
    /// `resolve_dir`.
    pub import_map: Option<String>,
    /// Specifier prefixes left external.
    pub externals: Vec<String>,
    /// Extension (with leading dot) to loader.
    pub custom_loaders: IndexMap<String, CustomLoader>,
}

/// Resolve and load hooks for a single engine invocation.
#[derive(Debug)]
pub struct ModuleResolver {
    options: ResolverOptions,
    fetcher: Arc<dyn Fetcher>,
    loader: Arc<dyn ModuleLoader>,
    import_map: OnceCell<Option<ImportMap>>,
    watch_files: Mutex<IndexSet<PathBuf>>,
    failures: Mutex<Vec<String>>,
}

impl ModuleResolver {
    pub fn new(
        options: ResolverOptions,
        fetcher: Arc<dyn Fetcher>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self {
            options,
            fetcher,
            loader,
            import_map: OnceCell::new(),
            watch_files: Mutex::new(IndexSet::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Custom loader registered for the extension of `path`, if any.
    pub fn custom_loader_for(&self, path: &str) -> Option<CustomLoader> {
        self.options
            .custom_loaders
            .iter()
            .find(|(ext, _)| path.ends_with(ext.as_str()))
            .map(|(_, loader)| *loader)
    }

    /// Local files read so far, in first-read order.
    pub fn watch_files(&self) -> Vec<PathBuf> {
        self.watch_files.lock().iter().cloned().collect()
    }

    pub fn record_watch_file(&self, path: PathBuf) {
        self.watch_files.lock().insert(path);
    }

    /// Remember why a hook failed; the engine only reports which module it was.
    pub fn record_failure(&self, message: String) {
        let mut failures = self.failures.lock();
        if !failures.contains(&message) {
            failures.push(message);
        }
    }

    /// Hook failure messages, in the order they happened.
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    fn is_external(&self, id: &str) -> bool {
        self.options
            .externals
            .iter()
            .any(|prefix| !prefix.is_empty() && id.starts_with(prefix.as_str()))
    }

    fn resolve_dir_url(&self) -> Result<Url> {
        let dir = std::path::absolute(&self.options.resolve_dir)?;
        Url::from_directory_path(&dir).map_err(|_| Error::Resolution {
            specifier: dir.display().to_string(),
            referrer: String::new(),
            message: "resolve directory is not an absolute path".to_string(),
        })
    }

    /// Referrer URL for an importer id as handed out by [`Self::resolve`].
    fn referrer(&self, importer: Option<&str>) -> Result<Url> {
        match importer {
            Some(id) => {
                if let Some(url) = parse_absolute_url(id) {
                    return Ok(url);
                }
                let path = Path::new(id);
                if path.is_absolute() {
                    return Url::from_file_path(path).map_err(|_| Error::Resolution {
                        specifier: id.to_string(),
                        referrer: String::new(),
                        message: "importer is not a valid path".to_string(),
                    });
                }
                self.resolve_dir_url()
            }
            None => self.resolve_dir_url(),
        }
    }

    async fn import_map(&self) -> Result<Option<&ImportMap>> {
        let map = self
            .import_map
            .get_or_try_init(|| async {
                let Some(locator) = self.options.import_map.as_deref() else {
                    return Ok(None);
                };
                let base = match parse_absolute_url(locator) {
                    Some(url) => url,
                    None => {
                        let path = std::path::absolute(self.options.resolve_dir.join(locator))?;
                        Url::from_file_path(&path).map_err(|_| Error::ImportMap {
                            locator: locator.to_string(),
                            message: "not a valid path".to_string(),
                        })?
                    }
                };
                let fetched = self.fetcher.fetch(base.as_str()).await.map_err(|e| {
                    Error::ImportMap {
                        locator: locator.to_string(),
                        message: e.to_string(),
                    }
                })?;
                tracing::debug!(%base, "loaded import map");
                ImportMap::from_json(&fetched.body, &base).map(Some)
            })
            .await?;
        Ok(map.as_ref())
    }

    /// Resolve `specifier` imported from `importer` (absent for entries).
    pub async fn resolve(&self, specifier: &str, importer: Option<&str>) -> Result<Resolved> {
        if self.is_external(specifier) {
            return Ok(Resolved::External(specifier.to_string()));
        }

        let referrer = self.referrer(importer)?;
        let url = match self.import_map().await? {
            Some(map) => map.resolve(specifier, &referrer)?,
            None => resolve_url(specifier, &referrer)?,
        };

        if self.is_external(url.as_str()) {
            return Ok(Resolved::External(url.to_string()));
        }

        if self.custom_loader_for(url.path()).is_some() {
            let path = file_url_to_path(&url).unwrap_or_else(|_| PathBuf::from(url.path()));
            return Ok(Resolved::Path(path));
        }

        Ok(Resolved::Module(url))
    }

    /// Load a module previously returned as [`Resolved::Module`].
    pub async fn load(&self, url: &Url) -> Result<LoadedModule> {
        if url.path().ends_with(".css") {
            return Ok(LoadedModule::new("", ModuleKind::Js));
        }

        let module = self.loader.load(url).await?;
        if let Some(path) = &module.watch {
            self.record_watch_file(path.clone());
        }
        Ok(module)
    }
}

/// Plain URL resolution: absolute paths and absolute URLs stand alone, everything
/// else joins against `referrer`.
pub fn resolve_url(specifier: &str, referrer: &Url) -> Result<Url> {
    let path = Path::new(specifier);
    if path.is_absolute() {
        return Url::from_file_path(path).map_err(|_| Error::Resolution {
            specifier: specifier.to_string(),
            referrer: referrer.to_string(),
            message: "invalid absolute path".to_string(),
        });
    }
    if let Some(url) = parse_absolute_url(specifier) {
        return Ok(url);
    }
    referrer.join(specifier).map_err(|e| Error::Resolution {
        specifier: specifier.to_string(),
        referrer: referrer.to_string(),
        message: e.to_string(),
    })
}
