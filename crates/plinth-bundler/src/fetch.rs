//! Fetching of remote documents and modules.
//!
//! Everything that leaves the machine goes through the [`Fetcher`] trait so that
//! the import cache and the portable module loader can be exercised without a
//! network.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use url::Url;

use crate::{Error, Result};

/// Body and content type of a fetched locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl Fetched {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    /// Body as UTF-8 text.
    pub fn text(&self, locator: &str) -> Result<String> {
        String::from_utf8(self.body.clone()).map_err(|_| Error::Network {
            url: locator.to_string(),
            message: "response body is not valid UTF-8".to_string(),
        })
    }
}

/// Retrieves the content behind a locator.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn fetch(&self, locator: &str) -> Result<Fetched>;
}

/// Default fetcher: `http(s)` through reqwest, `file:` URLs and plain paths from
/// disk, `data:` URLs decoded inline.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_http(&self, url: &Url) -> Result<Fetched> {
        let network = |message: String| Error::Network {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| network(e.to_string()))?
            .error_for_status()
            .map_err(|e| network(e.to_string()))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| network(e.to_string()))?;

        Ok(Fetched {
            body: body.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> Result<Fetched> {
        tracing::debug!(locator, "fetching");
        match parse_absolute_url(locator) {
            Some(url) if matches!(url.scheme(), "http" | "https") => self.fetch_http(&url).await,
            Some(url) if url.scheme() == "data" => decode_data_url(&url),
            Some(url) if url.scheme() == "file" => {
                let path = file_url_to_path(&url)?;
                read_local(&path).await
            }
            Some(url) => Err(Error::Network {
                url: url.to_string(),
                message: format!("unsupported scheme `{}`", url.scheme()),
            }),
            None => read_local(Path::new(locator)).await,
        }
    }
}

async fn read_local(path: &Path) -> Result<Fetched> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| Error::io_at("read", path, e))?;
    Ok(Fetched::new(body))
}

/// Parse `input` as an absolute URL, rejecting Windows drive letters.
pub fn parse_absolute_url(input: &str) -> Option<Url> {
    Url::parse(input).ok().filter(|url| url.scheme().len() > 1)
}

pub(crate) fn file_url_to_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path().map_err(|_| Error::Resolution {
        specifier: url.to_string(),
        referrer: String::new(),
        message: "not a local file URL".to_string(),
    })
}

/// Decode an RFC 2397 `data:` URL.
pub fn decode_data_url(url: &Url) -> Result<Fetched> {
    let invalid = |message: &str| Error::Resolution {
        specifier: url.to_string(),
        referrer: String::new(),
        message: message.to_string(),
    };

    let raw = url.as_str();
    let rest = raw
        .strip_prefix("data:")
        .ok_or_else(|| invalid("not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("data URL has no payload separator"))?;

    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };

    let body = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| invalid(&format!("invalid base64 payload: {}", e)))?
    } else {
        percent_decode(payload)
    };

    let content_type = (!mime.is_empty()).then(|| mime.to_string());
    Ok(Fetched { body, content_type })
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_data_url() {
        let url = Url::parse("data:application/json;base64,eyJhIjoxfQ==").unwrap();
        let fetched = decode_data_url(&url).unwrap();
        assert_eq!(fetched.body, br#"{"a":1}"#);
        assert_eq!(fetched.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_decode_percent_encoded_data_url() {
        let url = Url::parse("data:text/javascript,export%20default%201;").unwrap();
        let fetched = decode_data_url(&url).unwrap();
        assert_eq!(fetched.body, b"export default 1;");
    }

    #[test]
    fn test_parse_absolute_url_rejects_drive_letters() {
        assert!(parse_absolute_url("https://example.com/a.ts").is_some());
        assert!(parse_absolute_url("C:\\plugs\\a.ts").is_none());
        assert!(parse_absolute_url("./relative.ts").is_none());
    }

    #[tokio::test]
    async fn test_fetch_plain_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plug.json");
        std::fs::write(&path, "{}").unwrap();

        let fetched = HttpFetcher::new()
            .fetch(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.body, b"{}");
    }

    #[tokio::test]
    async fn test_fetch_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plug.json");
        std::fs::write(&path, "[]").unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let fetched = HttpFetcher::new().fetch(url.as_str()).await.unwrap();
        assert_eq!(fetched.body, b"[]");
    }
}
