//! Static asset bundling.
//!
//! An [`AssetBundle`] maps root-relative, `/`-separated paths to file contents. It
//! serializes to a flat JSON object whose values are `data:` URLs, which is the
//! form embedded in plugin artifacts and written by [`bundle_folder`].

use std::path::{Path, PathBuf};

use base64::Engine as _;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use path_clean::PathClean;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use walkdir::WalkDir;

use crate::fetch::decode_data_url;
use crate::{Error, Result};

/// Root-relative path to file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetBundle {
    files: IndexMap<String, Vec<u8>>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.files.insert(path.into(), data);
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Total payload size in bytes.
    pub fn total_size(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }
}

impl Serialize for AssetBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for (path, data) in &self.files {
            let encoded = base64::engine::general_purpose::STANDARD.encode(data);
            map.serialize_entry(
                path,
                &format!("data:{};base64,{}", mime_for_path(path), encoded),
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AssetBundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = IndexMap::<String, String>::deserialize(deserializer)?;
        let mut bundle = AssetBundle::new();
        for (path, data_url) in raw {
            let url = url::Url::parse(&data_url).map_err(D::Error::custom)?;
            let fetched = decode_data_url(&url).map_err(D::Error::custom)?;
            bundle.insert(path, fetched.body);
        }
        Ok(bundle)
    }
}

/// Guess the MIME type of an asset from its extension.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("css") => "text/css",
        Some("html") | Some("htm") => "text/html",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Bundle every file under `root` whose root-relative path matches one of `patterns`.
///
/// An empty pattern list yields an empty bundle without touching the filesystem.
pub async fn bundle_assets(root: &Path, patterns: &[String]) -> Result<AssetBundle> {
    if patterns.is_empty() {
        return Ok(AssetBundle::new());
    }

    let matcher = compile_patterns(patterns)?;
    let files = walk(root.to_path_buf(), move |rel| matcher.is_match(rel)).await?;
    let bundle = read_files(files).await?;

    tracing::debug!(
        root = %root.display(),
        assets = bundle.len(),
        "bundled assets"
    );
    Ok(bundle)
}

/// Bundle every file under `root` and write the bundle as pretty JSON to `output`.
pub async fn bundle_folder(root: &Path, output: &Path) -> Result<AssetBundle> {
    let output_abs = absolute(output);
    let root_abs = absolute(root);
    let excluded = output_abs
        .strip_prefix(&root_abs)
        .ok()
        .map(|rel| to_slash(rel));

    let files = walk(root.to_path_buf(), move |rel| {
        excluded.as_deref() != Some(rel)
    })
    .await?;
    let bundle = read_files(files).await?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_at("create directory", parent, e))?;
    }
    let json = serde_json::to_string_pretty(&bundle)?;
    tokio::fs::write(output, json)
        .await
        .map_err(|e| Error::io_at("write", output, e))?;

    tracing::info!(
        root = %root.display(),
        output = %output.display(),
        assets = bundle.len(),
        "wrote asset bundle"
    );
    Ok(bundle)
}

fn compile_patterns(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .map_err(|e| Error::Glob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| Error::Glob {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Collect `(relative path, absolute path)` pairs for regular files accepted by `filter`.
async fn walk<F>(root: PathBuf, filter: F) -> Result<Vec<(String, PathBuf)>>
where
    F: Fn(&str) -> bool + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&root).to_path_buf();
                Error::io_at("walk", &path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let rel = to_slash(rel);
            if filter(&rel) {
                files.push((rel, entry.into_path()));
            }
        }
        Ok(files)
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

async fn read_files(files: Vec<(String, PathBuf)>) -> Result<AssetBundle> {
    let mut bundle = AssetBundle::new();
    for (rel, path) in files {
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::io_at("read asset", &path, e))?;
        bundle.insert(rel, data);
    }
    Ok(bundle)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute, `..`-free form of `path` without touching the filesystem.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .clean()
}
