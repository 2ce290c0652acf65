//! Shared test utilities for plinth-bundler tests
//!
//! Fake build engines and fetchers with call counters, plus small fixture
//! helpers, so pipeline tests run without Rolldown or a network.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use plinth_bundler::{
    BuildEngine, BuildOptions, Compiler, EXPORT_BINDING, EngineOutput, EngineRequest, Error,
    Fetched, Fetcher, ManifestLoader,
};
use rustc_hash::FxHashMap;
use tokio::sync::Notify;

/// What the engine saw for one build.
#[derive(Debug, Clone)]
pub struct EngineCall {
    pub entry: PathBuf,
    pub source: String,
    pub minify: bool,
    pub externals: Vec<String>,
    pub import_map: Option<String>,
}

/// Engine that records each request and returns the entry source as a string.
///
/// An entry containing `SYNTAX_ERROR` fails the build.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
}

impl RecordingEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BuildEngine for RecordingEngine {
    async fn build(&self, request: EngineRequest) -> plinth_bundler::Result<EngineOutput> {
        let source = tokio::fs::read_to_string(&request.entry).await?;
        let options = request.resolver.options();
        self.calls.lock().push(EngineCall {
            entry: request.entry.clone(),
            source: source.clone(),
            minify: request.minify,
            externals: options.externals.clone(),
            import_map: options.import_map.clone(),
        });

        if source.contains("SYNTAX_ERROR") {
            return Err(Error::Engine(format!(
                "Unexpected token in {}",
                request.entry.display()
            )));
        }

        Ok(EngineOutput {
            code: format!(
                "var {} = {};",
                EXPORT_BINDING,
                serde_json::to_string(&source)?
            ),
            watch_files: vec![request.entry],
        })
    }
}

/// Engine that blocks every build until released.
#[derive(Debug, Default)]
pub struct GatedEngine {
    inner: RecordingEngine,
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl BuildEngine for GatedEngine {
    async fn build(&self, request: EngineRequest) -> plinth_bundler::Result<EngineOutput> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.build(request).await
    }
}

/// Fetcher serving canned bodies and counting requests per locator.
#[derive(Debug, Default)]
pub struct CountingFetcher {
    bodies: Mutex<FxHashMap<String, String>>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, locator: &str, body: &str) {
        self.bodies
            .lock()
            .insert(locator.to_string(), body.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, locator: &str) -> plinth_bundler::Result<Fetched> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.bodies.lock().get(locator) {
            Some(body) => Ok(Fetched::new(body.clone())),
            None => Err(Error::Network {
                url: locator.to_string(),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, contents).expect("write fixture");
    path
}

/// Compiler over a fake engine, rooted at `cwd` so no stray import map is picked up.
pub fn test_compiler(
    engine: Arc<dyn BuildEngine>,
    fetcher: Arc<dyn Fetcher>,
    cwd: &Path,
) -> Compiler {
    Compiler::new(engine, fetcher).with_cwd(cwd)
}

/// Manifest loader over a fake engine with its import cache under `root/.plinth-cache`.
pub fn test_loader(
    engine: Arc<dyn BuildEngine>,
    fetcher: Arc<dyn Fetcher>,
    root: &Path,
) -> ManifestLoader {
    let options = BuildOptions {
        cache_dir: root.join(".plinth-cache"),
        ..Default::default()
    };
    test_loader_with(engine, fetcher, root, options)
}

pub fn test_loader_with(
    engine: Arc<dyn BuildEngine>,
    fetcher: Arc<dyn Fetcher>,
    root: &Path,
    options: BuildOptions,
) -> ManifestLoader {
    let compiler = test_compiler(engine, fetcher.clone(), root);
    ManifestLoader::new(Arc::new(compiler), fetcher, options)
}

/// The demo plugin: one function exported from `greet.ts`.
pub fn demo_plugin(root: &Path) -> PathBuf {
    write_file(
        root,
        "greet.ts",
        "export function sayHi(name: string) {\n  return `hi ${name}`;\n}\n",
    );
    write_file(
        root,
        "demo.plug.yaml",
        "name: demo\nfunctions:\n  greet:\n    path: ./greet.ts:sayHi\n",
    )
}
