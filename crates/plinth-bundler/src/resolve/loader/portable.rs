use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use super::{LoadedModule, ModuleKind, ModuleLoader};
use crate::fetch::{Fetched, Fetcher, decode_data_url, file_url_to_path};
use crate::{Error, Result};

/// Loads `file:` modules from disk, `http(s):` modules through a [`Fetcher`]
/// (bodies cached for the loader's lifetime) and `data:` modules inline.
#[derive(Debug)]
pub struct PortableLoader {
    fetcher: Arc<dyn Fetcher>,
    remote: Mutex<FxHashMap<String, Fetched>>,
}

impl PortableLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            remote: Mutex::new(FxHashMap::default()),
        }
    }

    async fn fetch_cached(&self, url: &Url) -> Result<Fetched> {
        if let Some(hit) = self.remote.lock().get(url.as_str()) {
            return Ok(hit.clone());
        }
        let fetched = self.fetcher.fetch(url.as_str()).await?;
        self.remote
            .lock()
            .insert(url.to_string(), fetched.clone());
        Ok(fetched)
    }
}

fn classify(url: &Url, content_type: Option<&str>) -> ModuleKind {
    ModuleKind::from_extension(url.path())
        .or_else(|| content_type.and_then(ModuleKind::from_content_type))
        .unwrap_or(ModuleKind::Js)
}

fn into_text(url: &Url, fetched: Fetched) -> Result<(String, Option<String>)> {
    let Fetched { body, content_type } = fetched;
    let text = String::from_utf8(body).map_err(|_| Error::Network {
        url: url.to_string(),
        message: "module source is not valid UTF-8".to_string(),
    })?;
    Ok((text, content_type))
}

#[async_trait]
impl ModuleLoader for PortableLoader {
    async fn load(&self, url: &Url) -> Result<LoadedModule> {
        match url.scheme() {
            "file" => {
                let path = file_url_to_path(url)?;
                let code = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| Error::io_at("read", &path, e))?;
                Ok(LoadedModule::new(code, classify(url, None)).watching(path))
            }
            "http" | "https" => {
                let (code, content_type) = into_text(url, self.fetch_cached(url).await?)?;
                Ok(LoadedModule::new(code, classify(url, content_type.as_deref())))
            }
            "data" => {
                let (code, content_type) = into_text(url, decode_data_url(url)?)?;
                let kind = content_type
                    .as_deref()
                    .and_then(ModuleKind::from_content_type)
                    .unwrap_or(ModuleKind::Js);
                Ok(LoadedModule::new(code, kind))
            }
            other => Err(Error::Resolution {
                specifier: url.to_string(),
                referrer: String::new(),
                message: format!("unsupported scheme `{}`", other),
            }),
        }
    }
}
