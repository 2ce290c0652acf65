//! Batch builds and watch loops.
//!
//! [`BuildOrchestrator`] builds a set of manifests concurrently. A batch that
//! starts while another is running is skipped, so bursts of file events collapse
//! into at most one running batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::assets::bundle_folder;
use crate::manifest::{BuildReport, ManifestLoader};
use crate::watch::{FileWatcher, settle};
use crate::{Error, Result};

/// A manifest that failed to build.
#[derive(Debug)]
pub struct BuildFailure {
    pub manifest: PathBuf,
    pub error: Error,
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub built: Vec<BuildReport>,
    pub failed: Vec<BuildFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Releases the building flag when a batch ends, however it ends.
struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builds batches of manifests and rebuilds them on change.
#[derive(Debug)]
pub struct BuildOrchestrator {
    loader: ManifestLoader,
    building: AtomicBool,
    written: Mutex<FxHashSet<PathBuf>>,
    ignore_patterns: Vec<String>,
}

impl BuildOrchestrator {
    pub fn new(loader: ManifestLoader) -> Self {
        Self {
            loader,
            building: AtomicBool::new(false),
            written: Mutex::new(FxHashSet::default()),
            ignore_patterns: Vec::new(),
        }
    }

    /// Extra ignore patterns for watch mode.
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn loader(&self) -> &ManifestLoader {
        &self.loader
    }

    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<BuildGuard<'_>> {
        self.building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BuildGuard(&self.building))
    }

    async fn remember_output(&self, path: &Path) {
        let canonical = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        self.written.lock().insert(canonical);
    }

    async fn is_own_output(&self, path: &Path) -> bool {
        let known = self.written.lock().contains(path);
        if known {
            return true;
        }
        match tokio::fs::canonicalize(path).await {
            Ok(canonical) => self.written.lock().contains(&canonical),
            Err(_) => false,
        }
    }

    /// Whether every path is an artifact written by an earlier batch.
    async fn only_own_outputs(&self, paths: &[PathBuf]) -> bool {
        for path in paths {
            if !self.is_own_output(path).await {
                return false;
            }
        }
        true
    }

    /// Build every manifest concurrently.
    ///
    /// Returns `Ok(None)` without doing anything when a batch is already running.
    /// Per-manifest failures are logged and collected, never propagated.
    pub async fn build_all(
        &self,
        manifests: &[PathBuf],
        out_dir: &Path,
    ) -> Result<Option<BatchReport>> {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("build already running, skipping batch");
            return Ok(None);
        };

        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| Error::io_at("create output directory", out_dir, e))?;

        tracing::info!(manifests = manifests.len(), "building plugins");
        let results = join_all(
            manifests
                .iter()
                .map(|manifest| self.loader.build_manifest(manifest, out_dir)),
        )
        .await;

        let mut report = BatchReport::default();
        for (manifest, result) in manifests.iter().zip(results) {
            match result {
                Ok(built) => {
                    self.remember_output(&built.output).await;
                    report.built.push(built);
                }
                Err(error) => {
                    tracing::error!(manifest = %manifest.display(), error = %error, "failed to build manifest");
                    report.failed.push(BuildFailure {
                        manifest: manifest.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            built = report.built.len(),
            failed = report.failed.len(),
            "build finished"
        );
        Ok(Some(report))
    }

    /// Build once, then rebuild on every change under the manifests' directories
    /// until `shutdown` fires or the watcher stops.
    pub async fn watch(
        self: Arc<Self>,
        manifests: Vec<PathBuf>,
        out_dir: PathBuf,
        shutdown: CancellationToken,
    ) -> Result<()> {
        self.build_all(&manifests, &out_dir).await?;

        let mut roots: Vec<PathBuf> = Vec::new();
        for manifest in &manifests {
            let dir = std::path::absolute(manifest)?
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            if !roots.contains(&dir) {
                roots.push(dir);
            }
        }

        let (_watcher, mut rx) = FileWatcher::new(roots, self.ignore_patterns.clone())?;
        let manifests = Arc::new(manifests);
        let out_dir = Arc::new(out_dir);
        let mut rebuilds = JoinSet::new();
        tracing::info!("watching for changes");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = rx.recv() => {
                    let Some(event) = event else { break };
                    if self.only_own_outputs(&event.paths).await {
                        continue;
                    }
                    tracing::info!(paths = ?event.paths, "change detected, rebuilding");

                    let this = Arc::clone(&self);
                    let manifests = Arc::clone(&manifests);
                    let out_dir = Arc::clone(&out_dir);
                    rebuilds.spawn(async move { this.build_all(&manifests, &out_dir).await });
                }
                Some(done) = rebuilds.join_next(), if !rebuilds.is_empty() => {
                    log_rebuild(done);
                }
            }
        }

        while let Some(done) = rebuilds.join_next().await {
            log_rebuild(done);
        }
        Ok(())
    }
}

fn log_rebuild(done: std::result::Result<Result<Option<BatchReport>>, tokio::task::JoinError>) {
    match done {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "rebuild failed"),
        Err(e) => tracing::error!(error = %e, "rebuild task panicked"),
    }
}

/// Bundle `root` into `output`, then rebundle after each burst of changes once
/// `delay` has passed without further events.
pub async fn watch_folder(
    root: PathBuf,
    output: PathBuf,
    delay: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    bundle_folder(&root, &output).await?;

    let output_abs = std::path::absolute(&output)?;
    let output_canonical = tokio::fs::canonicalize(&output)
        .await
        .unwrap_or_else(|_| output_abs.clone());
    let (_watcher, mut rx) = FileWatcher::new(vec![root.clone()], Vec::new())?;
    tracing::info!(root = %root.display(), "watching folder");

    loop {
        let burst = tokio::select! {
            _ = shutdown.cancelled() => break,
            burst = settle(&mut rx, delay) => burst,
        };
        let Some(burst) = burst else { break };

        let relevant = burst
            .iter()
            .flat_map(|event| event.paths.iter())
            .any(|path| path != &output_abs && path != &output_canonical);
        if !relevant {
            continue;
        }

        if let Err(e) = bundle_folder(&root, &output).await {
            tracing::error!(root = %root.display(), error = %e, "failed to bundle folder");
        }
    }
    Ok(())
}
