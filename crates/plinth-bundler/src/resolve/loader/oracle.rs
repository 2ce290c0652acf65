use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use url::Url;

use super::{LoadedModule, ModuleKind, ModuleLoader};
use crate::{Error, Result};

const MAX_REDIRECTS: usize = 10;

/// Module graph as reported by `deno info --json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleGraph {
    #[serde(default)]
    pub redirects: IndexMap<String, String>,
    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub specifier: String,
    #[serde(default)]
    pub local: Option<PathBuf>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Describes the module graph rooted at a URL, materializing modules locally.
#[async_trait]
pub trait ModuleGraphOracle: Send + Sync + std::fmt::Debug {
    async fn describe(&self, url: &Url) -> Result<ModuleGraph>;
}

/// Oracle backed by the `deno info --json` subprocess.
#[derive(Debug, Clone)]
pub struct DenoInfoOracle {
    program: PathBuf,
}

impl Default for DenoInfoOracle {
    fn default() -> Self {
        Self::new("deno")
    }
}

impl DenoInfoOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ModuleGraphOracle for DenoInfoOracle {
    async fn describe(&self, url: &Url) -> Result<ModuleGraph> {
        let oracle_error = |message: String| Error::Oracle {
            url: url.to_string(),
            message,
        };

        let output = tokio::process::Command::new(&self.program)
            .arg("info")
            .arg("--json")
            .arg(url.as_str())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                oracle_error(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(oracle_error(stderr.trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| oracle_error(format!("unreadable module graph: {}", e)))
    }
}

/// Loads modules from the local copies reported by a [`ModuleGraphOracle`].
///
/// The oracle is asked at most once per URL; every graph it returns is merged
/// into the loader's redirect and record tables.
#[derive(Debug)]
pub struct OracleLoader {
    oracle: Arc<dyn ModuleGraphOracle>,
    redirects: Mutex<FxHashMap<String, String>>,
    records: Mutex<FxHashMap<String, ModuleRecord>>,
}

impl OracleLoader {
    pub fn new(oracle: Arc<dyn ModuleGraphOracle>) -> Self {
        Self {
            oracle,
            redirects: Mutex::new(FxHashMap::default()),
            records: Mutex::new(FxHashMap::default()),
        }
    }

    fn is_known(&self, specifier: &str) -> bool {
        self.records.lock().contains_key(specifier) || self.redirects.lock().contains_key(specifier)
    }

    fn merge(&self, graph: ModuleGraph) {
        self.redirects.lock().extend(graph.redirects);
        let mut records = self.records.lock();
        for record in graph.modules {
            records.insert(record.specifier.clone(), record);
        }
    }

    fn authoritative(&self, url: &Url) -> Result<ModuleRecord> {
        let redirects = self.redirects.lock();
        let mut specifier = url.to_string();
        for _ in 0..MAX_REDIRECTS {
            match redirects.get(&specifier) {
                Some(next) => specifier = next.clone(),
                None => break,
            }
        }
        drop(redirects);

        self.records
            .lock()
            .get(&specifier)
            .cloned()
            .ok_or_else(|| Error::Oracle {
                url: url.to_string(),
                message: "module is missing from the reported graph".to_string(),
            })
    }
}

#[async_trait]
impl ModuleLoader for OracleLoader {
    async fn load(&self, url: &Url) -> Result<LoadedModule> {
        if !matches!(url.scheme(), "http" | "https" | "data" | "file") {
            return Err(Error::Resolution {
                specifier: url.to_string(),
                referrer: String::new(),
                message: format!("unsupported scheme `{}`", url.scheme()),
            });
        }

        if !self.is_known(url.as_str()) {
            let graph = self.oracle.describe(url).await?;
            self.merge(graph);
        }

        let record = self.authoritative(url)?;
        if let Some(message) = record.error {
            return Err(Error::Oracle {
                url: url.to_string(),
                message,
            });
        }
        let local = record.local.ok_or_else(|| Error::NotMaterialized {
            url: url.to_string(),
        })?;

        let code = tokio::fs::read_to_string(&local)
            .await
            .map_err(|e| Error::io_at("read", &local, e))?;
        let kind = record
            .media_type
            .as_deref()
            .map(ModuleKind::from_media_type)
            .unwrap_or(ModuleKind::Js);

        let module = LoadedModule::new(code, kind);
        Ok(if url.scheme() == "file" {
            module.watching(local)
        } else {
            module
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CannedOracle {
        graph: ModuleGraph,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModuleGraphOracle for CannedOracle {
        async fn describe(&self, _url: &Url) -> Result<ModuleGraph> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.graph.clone())
        }
    }

    fn record(specifier: &str, local: Option<PathBuf>, media_type: &str) -> ModuleRecord {
        ModuleRecord {
            specifier: specifier.to_string(),
            local,
            media_type: Some(media_type.to_string()),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_follows_redirects_and_asks_once() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("mod.ts");
        std::fs::write(&local, "export const x: number = 1;").unwrap();

        let mut graph = ModuleGraph::default();
        graph.redirects.insert(
            "https://deno.land/x/mod.ts".to_string(),
            "https://deno.land/x/mod@1.0.0/mod.ts".to_string(),
        );
        graph.modules.push(record(
            "https://deno.land/x/mod@1.0.0/mod.ts",
            Some(local),
            "TypeScript",
        ));
        let oracle = Arc::new(CannedOracle {
            graph,
            calls: AtomicUsize::new(0),
        });
        let loader = OracleLoader::new(oracle.clone());

        let url = Url::parse("https://deno.land/x/mod.ts").unwrap();
        let first = loader.load(&url).await.unwrap();
        let second = loader.load(&url).await.unwrap();

        assert_eq!(first.kind, ModuleKind::Ts);
        assert_eq!(first.code, second.code);
        assert!(first.watch.is_none());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_local_copy_is_not_materialized() {
        let mut graph = ModuleGraph::default();
        graph
            .modules
            .push(record("https://example.com/a.js", None, "JavaScript"));
        let loader = OracleLoader::new(Arc::new(CannedOracle {
            graph,
            calls: AtomicUsize::new(0),
        }));

        let err = loader
            .load(&Url::parse("https://example.com/a.js").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotMaterialized { .. }));
    }

    #[tokio::test]
    async fn test_record_error_is_reported() {
        let mut graph = ModuleGraph::default();
        graph.modules.push(ModuleRecord {
            specifier: "https://example.com/broken.ts".to_string(),
            error: Some("Module not found".to_string()),
            ..Default::default()
        });
        let loader = OracleLoader::new(Arc::new(CannedOracle {
            graph,
            calls: AtomicUsize::new(0),
        }));

        let err = loader
            .load(&Url::parse("https://example.com/broken.ts").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Module not found"));
    }

    #[test]
    fn test_parses_deno_info_output() {
        let graph: ModuleGraph = serde_json::from_str(
            r#"{
                "roots": ["file:///work/a.ts"],
                "modules": [{
                    "kind": "esm",
                    "specifier": "file:///work/a.ts",
                    "local": "/work/a.ts",
                    "mediaType": "TypeScript",
                    "size": 10
                }],
                "redirects": {}
            }"#,
        )
        .unwrap();
        assert_eq!(graph.modules[0].local.as_deref(), Some(std::path::Path::new("/work/a.ts")));
        assert_eq!(graph.modules[0].media_type.as_deref(), Some("TypeScript"));
    }
}
