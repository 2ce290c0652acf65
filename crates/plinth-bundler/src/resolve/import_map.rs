//! Import map resolution (`imports` plus `scopes`, longest prefix wins).

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

use crate::fetch::parse_absolute_url;
use crate::{Error, Result};

#[derive(Debug, Default, Deserialize)]
struct RawImportMap {
    #[serde(default)]
    imports: IndexMap<String, String>,
    #[serde(default)]
    scopes: IndexMap<String, IndexMap<String, String>>,
}

/// Specifier map with addresses already resolved against the map's own URL.
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    imports: Vec<(String, Url)>,
    scopes: Vec<(String, Vec<(String, Url)>)>,
}

impl ImportMap {
    /// Parse an import map document located at `base`.
    pub fn from_json(source: &[u8], base: &Url) -> Result<Self> {
        let raw: RawImportMap = serde_json::from_slice(source).map_err(|e| Error::ImportMap {
            locator: base.to_string(),
            message: e.to_string(),
        })?;

        let imports = normalize_entries(&raw.imports, base)?;
        let mut scopes = Vec::with_capacity(raw.scopes.len());
        for (scope, entries) in &raw.scopes {
            let scope_url = base.join(scope).map_err(|e| Error::ImportMap {
                locator: base.to_string(),
                message: format!("invalid scope '{}': {}", scope, e),
            })?;
            scopes.push((scope_url.to_string(), normalize_entries(entries, base)?));
        }
        scopes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Ok(Self { imports, scopes })
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.scopes.is_empty()
    }

    /// Resolve `specifier` as imported from `referrer`.
    pub fn resolve(&self, specifier: &str, referrer: &Url) -> Result<Url> {
        let as_url = url_like(specifier, referrer);
        let normalized = as_url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_else(|| specifier.to_string());

        let referrer_str = referrer.as_str();
        for (scope, entries) in &self.scopes {
            let applies =
                scope == referrer_str || (scope.ends_with('/') && referrer_str.starts_with(scope));
            if applies {
                if let Some(url) = match_entries(entries, &normalized)? {
                    return Ok(url);
                }
            }
        }

        if let Some(url) = match_entries(&self.imports, &normalized)? {
            return Ok(url);
        }

        as_url.ok_or_else(|| Error::Resolution {
            specifier: specifier.to_string(),
            referrer: referrer.to_string(),
            message: "bare specifier is not mapped by the import map".to_string(),
        })
    }
}

fn normalize_entries(
    entries: &IndexMap<String, String>,
    base: &Url,
) -> Result<Vec<(String, Url)>> {
    let mut normalized = Vec::with_capacity(entries.len());
    for (key, address) in entries {
        let key = url_like(key, base)
            .map(|u| u.to_string())
            .unwrap_or_else(|| key.clone());
        let target = base.join(address).map_err(|e| Error::ImportMap {
            locator: base.to_string(),
            message: format!("invalid address '{}' for '{}': {}", address, key, e),
        })?;
        normalized.push((key, target));
    }
    normalized.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    Ok(normalized)
}

/// Entries are sorted longest key first, so the first hit is the longest prefix.
fn match_entries(entries: &[(String, Url)], normalized: &str) -> Result<Option<Url>> {
    for (key, target) in entries {
        if key == normalized {
            return Ok(Some(target.clone()));
        }
        if key.ends_with('/') {
            if let Some(rest) = normalized.strip_prefix(key.as_str()) {
                let url = target.join(rest).map_err(|e| Error::Resolution {
                    specifier: normalized.to_string(),
                    referrer: target.to_string(),
                    message: e.to_string(),
                })?;
                return Ok(Some(url));
            }
        }
    }
    Ok(None)
}

/// Relative (`./`, `../`, `/`) or absolute URL specifiers resolve to a URL; bare ones do not.
fn url_like(specifier: &str, base: &Url) -> Option<Url> {
    if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        return base.join(specifier).ok();
    }
    parse_absolute_url(specifier)
}
