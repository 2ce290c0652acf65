//! Rolldown plugins exposing [`ModuleResolver`] to the bundler.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use base64::Engine as _;
use rolldown_common::{ModuleType, ResolvedExternal};
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use url::Url;

use crate::fetch::parse_absolute_url;
use crate::resolve::{CustomLoader, ModuleKind, ModuleResolver, Resolved};

/// Schemes the resolver's load hook serves.
const LOADABLE_SCHEMES: &[&str] = &["http", "https", "data", "file"];

/// Resolve and load hooks backed by a [`ModuleResolver`].
///
/// `file:` modules are handed to Rolldown as plain absolute paths, remote modules
/// keep their URL as module id.
#[derive(Debug, Clone)]
pub struct ResolverHooks {
    resolver: Arc<ModuleResolver>,
}

impl ResolverHooks {
    pub fn new(resolver: Arc<ModuleResolver>) -> Self {
        Self { resolver }
    }
}

fn module_id(url: &Url) -> String {
    if url.scheme() == "file" {
        if let Ok(path) = url.to_file_path() {
            return path.to_string_lossy().into_owned();
        }
    }
    url.to_string()
}

/// Module URL for an id produced by [`module_id`], `None` for ids owned elsewhere.
fn id_to_url(resolver: &ModuleResolver, id: &str) -> Option<Url> {
    if let Some(url) = parse_absolute_url(id) {
        return LOADABLE_SCHEMES.contains(&url.scheme()).then_some(url);
    }
    let path = Path::new(id);
    if path.is_absolute() && resolver.custom_loader_for(id).is_none() {
        return Url::from_file_path(path).ok();
    }
    None
}

impl Plugin for ResolverHooks {
    fn name(&self) -> Cow<'static, str> {
        "plinth-resolver".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(str::to_string);
        let resolver = Arc::clone(&self.resolver);

        async move {
            // Engine-internal virtual modules.
            if specifier.starts_with('\0') || specifier.starts_with("rolldown:") {
                return Ok(None);
            }

            let resolved = resolver
                .resolve(&specifier, importer.as_deref())
                .await
                .inspect_err(|e| resolver.record_failure(e.to_string()))
                .with_context(|| format!("Failed to resolve '{}'", specifier))?;

            let (id, external) = match resolved {
                Resolved::External(id) => (id, true),
                Resolved::Path(path) => (path.to_string_lossy().into_owned(), false),
                Resolved::Module(url) => (module_id(&url), false),
            };

            Ok(Some(HookResolveIdOutput {
                id: id.into(),
                external: Some(ResolvedExternal::Bool(external)),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let resolver = Arc::clone(&self.resolver);

        async move {
            let Some(url) = id_to_url(&resolver, &id) else {
                return Ok(None);
            };

            let module = resolver
                .load(&url)
                .await
                .inspect_err(|e| resolver.record_failure(e.to_string()))
                .with_context(|| format!("Failed to load {}", url))?;

            Ok(Some(HookLoadOutput {
                code: module.code.into(),
                module_type: Some(module_type(module.kind)),
                ..Default::default()
            }))
        }
    }
}

fn module_type(kind: ModuleKind) -> ModuleType {
    match kind {
        ModuleKind::Js => ModuleType::Js,
        ModuleKind::Jsx => ModuleType::Jsx,
        ModuleKind::Ts => ModuleType::Ts,
        ModuleKind::Tsx => ModuleType::Tsx,
        ModuleKind::Json => ModuleType::Json,
    }
}

/// Serves files claimed by a custom per-extension loader.
#[derive(Debug, Clone)]
pub struct RawLoaderPlugin {
    resolver: Arc<ModuleResolver>,
}

impl RawLoaderPlugin {
    pub fn new(resolver: Arc<ModuleResolver>) -> Self {
        Self { resolver }
    }
}

/// Module source for a file's raw bytes under `loader`.
pub(crate) fn raw_module(
    loader: CustomLoader,
    bytes: Vec<u8>,
) -> anyhow::Result<(String, ModuleType)> {
    Ok(match loader {
        CustomLoader::Text => {
            let text = String::from_utf8(bytes).context("text asset is not valid UTF-8")?;
            (
                format!("export default {};", serde_json::to_string(&text)?),
                ModuleType::Js,
            )
        }
        CustomLoader::Base64 => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            (format!("export default \"{}\";", encoded), ModuleType::Js)
        }
        CustomLoader::Json => {
            let text = String::from_utf8(bytes).context("JSON asset is not valid UTF-8")?;
            (text, ModuleType::Json)
        }
    })
}

impl Plugin for RawLoaderPlugin {
    fn name(&self) -> Cow<'static, str> {
        "plinth-raw-loader".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let resolver = Arc::clone(&self.resolver);

        async move {
            let Some(loader) = resolver.custom_loader_for(&id) else {
                return Ok(None);
            };

            let bytes = tokio::fs::read(&id)
                .await
                .inspect_err(|e| resolver.record_failure(format!("Failed to read {}: {}", id, e)))
                .with_context(|| format!("Failed to read {}", id))?;
            resolver.record_watch_file(id.clone().into());

            let (code, module_type) = raw_module(loader, bytes)?;
            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(module_type),
                ..Default::default()
            }))
        }
    }
}
