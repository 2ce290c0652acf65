//! File system watching for incremental rebuilds.
//!
//! Watches a set of root directories recursively and forwards filtered change
//! events over a bounded channel. Hidden paths and configured ignore patterns
//! never reach the receiver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{Error, Result};

const CHANNEL_CAPACITY: usize = 100;

/// What happened to the paths of a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A filtered file system change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

/// Recursive watcher over one or more roots.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Start watching `roots`.
    ///
    /// Patterns starting with `*` match path suffixes (`*.log`); anything else
    /// matches a leading path or a path segment (`node_modules`).
    pub fn new(
        roots: Vec<PathBuf>,
        ignore_patterns: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let mut canonical = Vec::with_capacity(roots.len());
        for root in &roots {
            let root = std::fs::canonicalize(root).map_err(|e| Error::io_at("watch", root, e))?;
            if !canonical.contains(&root) {
                canonical.push(root);
            }
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let filter_roots = canonical.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "watch error");
                    return;
                }
            };

            let kind = match event.kind {
                notify::EventKind::Create(_) => ChangeKind::Created,
                notify::EventKind::Modify(_) => ChangeKind::Modified,
                notify::EventKind::Remove(_) => ChangeKind::Removed,
                _ => return,
            };

            let paths: Vec<PathBuf> = event
                .paths
                .into_iter()
                .filter(|path| !should_ignore(path, &filter_roots, &ignore_patterns))
                .collect();
            if paths.is_empty() {
                return;
            }

            // Receiver gone means the watch loop ended.
            let _ = tx.blocking_send(ChangeEvent { kind, paths });
        })?;

        for root in &canonical {
            watcher.watch(root, RecursiveMode::Recursive)?;
            tracing::debug!(root = %root.display(), "watching");
        }

        Ok((
            Self {
                _watcher: watcher,
                roots: canonical,
            },
            rx,
        ))
    }

    /// Canonical roots being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

fn should_ignore(path: &Path, roots: &[PathBuf], ignore_patterns: &[String]) -> bool {
    // Only paths within a watched root
    let Some(rel_path) = roots.iter().find_map(|root| path.strip_prefix(root).ok()) else {
        return true;
    };

    let path_str = rel_path.to_string_lossy();

    for pattern in ignore_patterns {
        if let Some(suffix) = pattern.strip_prefix('*') {
            if path_str.ends_with(suffix) {
                return true;
            }
        } else if path_str.starts_with(pattern.as_str())
            || path_str.contains(&format!("/{}", pattern))
        {
            return true;
        }
    }

    // Ignore hidden files and directories
    rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    })
}

/// Wait for the next burst of events and return it once `delay` passes without
/// another event. `None` when the channel closed before any event arrived.
pub async fn settle(
    rx: &mut mpsc::Receiver<ChangeEvent>,
    delay: Duration,
) -> Option<Vec<ChangeEvent>> {
    let first = rx.recv().await?;
    let mut burst = vec![first];
    while let Ok(Some(event)) = tokio::time::timeout(delay, rx.recv()).await {
        burst.push(event);
    }
    Some(burst)
}
