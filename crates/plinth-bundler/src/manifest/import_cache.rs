//! On-disk cache of imported manifests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::fetch::Fetcher;
use crate::{Error, Result};

/// Filesystem-safe cache key: every non-ASCII-alphanumeric character becomes `_`.
pub fn cache_key(locator: &str) -> String {
    locator
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Imported manifests keyed by [`cache_key`] under one directory.
///
/// Entries never expire; a forced reload refetches and overwrites them.
#[derive(Debug, Clone)]
pub struct ImportCache {
    dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
}

impl ImportCache {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, locator: &str) -> PathBuf {
        self.dir.join(cache_key(locator))
    }

    /// Resolve an imported manifest, from cache unless `reload` is set.
    pub async fn resolve(&self, locator: &str, reload: bool) -> Result<Value> {
        let path = self.entry_path(locator);

        if !reload {
            if let Some(cached) = read_cached(&path).await {
                tracing::debug!(locator, "import cache hit");
                return Ok(cached);
            }
        }

        tracing::info!(locator, reload, "fetching import");
        let fetched = self.fetcher.fetch(locator).await?;
        let document: Value =
            serde_json::from_slice(&fetched.body).map_err(|e| Error::Network {
                url: locator.to_string(),
                message: format!("response is not a JSON manifest: {}", e),
            })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::io_at("create cache directory", &self.dir, e))?;
        tokio::fs::write(&path, serde_json::to_vec(&document)?)
            .await
            .map_err(|e| Error::io_at("write cache entry", &path, e))?;

        Ok(document)
    }
}

/// A missing or unparsable entry counts as a miss.
async fn read_cached(path: &Path) -> Option<Value> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "discarding corrupt cache entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_sanitizes_locator() {
        assert_eq!(
            cache_key("https://example/plug.json"),
            "https___example_plug_json"
        );
        assert_eq!(cache_key("abc123"), "abc123");
        assert_eq!(cache_key("ü"), "_");
    }
}
