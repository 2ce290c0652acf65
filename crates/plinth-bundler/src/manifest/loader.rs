use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::Instrument;

use super::stage::{
    AssetPatterns, AssetsResolved, CompiledDependencies, CompiledFunctions, DependenciesResolved,
    DependencyLocators, FunctionSources, ImportLocators, ImportsResolved, Manifest, Named,
    ResolvedImports, ResolvedManifest, Stage,
};
use super::{BuildOptions, ImportCache, ManifestDocument, artifact_path, parse_function_path};
use crate::assets::bundle_assets;
use crate::compiler::{CompileOptions, Compiler};
use crate::fetch::Fetcher;
use crate::{Error, Result};

/// Summary of one written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub manifest: PathBuf,
    pub name: String,
    pub output: PathBuf,
    /// Function name and compiled script size, in manifest order.
    pub functions: Vec<(String, usize)>,
    pub dependencies: usize,
    pub assets: usize,
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} -> {}", self.name, self.output.display())?;
        writeln!(
            f,
            "  {} dependencies, {} assets",
            self.dependencies, self.assets
        )?;
        for (name, size) in &self.functions {
            writeln!(f, "  fn {} ({} bytes)", name, size)?;
        }
        Ok(())
    }
}

/// Resolves manifests stage by stage and writes their artifacts.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    compiler: Arc<Compiler>,
    imports: ImportCache,
    options: BuildOptions,
}

impl ManifestLoader {
    pub fn new(compiler: Arc<Compiler>, fetcher: Arc<dyn Fetcher>, options: BuildOptions) -> Self {
        let imports = ImportCache::new(options.cache_dir.clone(), fetcher);
        Self {
            compiler,
            imports,
            options,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn import_cache(&self) -> &ImportCache {
        &self.imports
    }

    fn compile_options(&self, externals: Vec<String>) -> CompileOptions {
        CompileOptions {
            debug: self.options.debug,
            externals,
            import_map: self.options.import_map.clone(),
            custom_loaders: self.options.custom_loaders.clone(),
        }
    }

    /// Read and parse a manifest, failing before any other work when `name` is absent.
    pub async fn parse(&self, path: &Path) -> Result<Named> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_at("read manifest", path, e))?;
        let document = ManifestDocument::parse(&source, path)?;
        tracing::trace!(stage = %Stage::Parsed, "manifest stage");

        let name = document.name.ok_or_else(|| Error::MissingField {
            path: path.display().to_string(),
            field: "name",
        })?;

        let base_dir = std::path::absolute(path)?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Manifest {
            name,
            dependencies: DependencyLocators(document.dependencies),
            assets: AssetPatterns(document.assets),
            imports: ImportLocators(document.imports),
            functions: FunctionSources(document.functions),
            extra: document.extra,
            base_dir,
        })
    }

    async fn resolve_dependencies(&self, manifest: Named) -> Result<DependenciesResolved> {
        let externals: Vec<String> = manifest.dependencies.0.keys().cloned().collect();
        let options = self.compile_options(externals);
        let base_dir = manifest.base_dir.clone();

        let compiled = try_join_all(manifest.dependencies.0.iter().map(|(name, locator)| {
            let options = &options;
            let base_dir = &base_dir;
            async move {
                let code = self
                    .compiler
                    .compile_module(base_dir, locator, options)
                    .await?;
                Ok::<_, Error>((name.clone(), code))
            }
        }))
        .await?;

        Ok(manifest.with_dependencies(CompiledDependencies(compiled.into_iter().collect())))
    }

    async fn resolve_assets(&self, manifest: DependenciesResolved) -> Result<AssetsResolved> {
        let bundle = bundle_assets(&manifest.base_dir, &manifest.assets.0).await?;
        Ok(manifest.with_assets(bundle))
    }

    async fn resolve_imports(&self, manifest: AssetsResolved) -> Result<ImportsResolved> {
        let reload = self.options.reload;
        let documents = try_join_all(
            manifest
                .imports
                .0
                .iter()
                .map(|locator| self.imports.resolve(locator, reload)),
        )
        .await?;
        Ok(manifest.with_imports(ResolvedImports(documents)))
    }

    async fn resolve_functions(&self, manifest: ImportsResolved) -> Result<ResolvedManifest> {
        let mut externals: Vec<String> = manifest.dependencies.0.keys().cloned().collect();
        for name in manifest.imports.dependency_names() {
            if !externals.iter().any(|e| e == name) {
                externals.push(name.to_string());
            }
        }
        let options = self.compile_options(externals);
        let base_dir = manifest.base_dir.clone();

        let compiled = try_join_all(manifest.functions.0.iter().map(|(name, def)| {
            let options = &options;
            let base_dir = &base_dir;
            async move {
                let mut def = def.clone();
                if let Some(raw_path) = def.path.take() {
                    let (file, symbol) = parse_function_path(&raw_path);
                    let code = self
                        .compiler
                        .compile(&base_dir.join(file), Some(symbol), options)
                        .await?;
                    def.code = Some(code);
                }
                Ok::<_, Error>((name.clone(), def))
            }
        }))
        .await?;

        Ok(manifest.with_functions(CompiledFunctions(compiled.into_iter().collect())))
    }

    /// Run every resolution stage on the manifest at `path`.
    pub async fn resolve(&self, path: &Path) -> Result<ResolvedManifest> {
        let manifest = self.parse(path).await?;
        tracing::debug!(stage = %Stage::Named, name = %manifest.name, "manifest stage");

        let manifest = self.resolve_dependencies(manifest).await?;
        tracing::debug!(stage = %Stage::DependenciesResolved, "manifest stage");

        let manifest = self.resolve_assets(manifest).await?;
        tracing::debug!(stage = %Stage::AssetsResolved, assets = manifest.assets.len(), "manifest stage");

        let manifest = self.resolve_imports(manifest).await?;
        tracing::debug!(stage = %Stage::ImportsResolved, "manifest stage");

        let manifest = self.resolve_functions(manifest).await?;
        tracing::debug!(stage = %Stage::FunctionsResolved, "manifest stage");

        Ok(manifest)
    }

    /// Resolve the manifest at `path` and write its artifact into `out_dir`.
    pub async fn build_manifest(&self, path: &Path, out_dir: &Path) -> Result<BuildReport> {
        let span = tracing::info_span!("build_manifest", manifest = %path.display());
        async move {
            let manifest = self.resolve(path).await?;
            let output = artifact_path(path, out_dir);

            let json = serde_json::to_string_pretty(&manifest)?;
            tokio::fs::create_dir_all(out_dir)
                .await
                .map_err(|e| Error::io_at("create output directory", out_dir, e))?;
            tokio::fs::write(&output, json)
                .await
                .map_err(|e| Error::io_at("write artifact", &output, e))?;
            tracing::debug!(stage = %Stage::Finalized, output = %output.display(), "manifest stage");

            let report = BuildReport {
                manifest: path.to_path_buf(),
                name: manifest.name.clone(),
                output,
                functions: manifest
                    .functions
                    .0
                    .iter()
                    .map(|(name, def)| (name.clone(), def.code.as_ref().map_or(0, String::len)))
                    .collect(),
                dependencies: manifest.dependencies.0.len(),
                assets: manifest.assets.len(),
            };

            if self.options.info {
                tracing::info!("{}", report.to_string().trim_end());
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }
}
