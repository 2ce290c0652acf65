use std::sync::Arc;

use async_trait::async_trait;
use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform,
    RawMinifyOptions,
};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;

use super::{BuildEngine, EngineOutput, EngineRequest, RawLoaderPlugin, ResolverHooks};
use crate::{Error, Result};

/// Build engine backed by Rolldown.
///
/// Every request bundles one entry into an IIFE for the browser platform. All
/// module resolution goes through [`ResolverHooks`]; files claimed by a custom
/// loader are served by [`RawLoaderPlugin`].
#[derive(Debug, Clone, Default)]
pub struct RolldownEngine;

impl RolldownEngine {
    pub fn new() -> Self {
        Self
    }

    fn options(request: &EngineRequest) -> BundlerOptions {
        BundlerOptions {
            input: Some(vec![InputItem {
                name: Some("plug".to_string()),
                import: request.entry.to_string_lossy().into_owned(),
            }]),
            cwd: Some(request.cwd.clone()),
            format: Some(OutputFormat::Iife),
            name: Some(request.global_name.clone()),
            platform: Some(Platform::Browser),
            minify: request.minify.then(|| RawMinifyOptions::from(true)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BuildEngine for RolldownEngine {
    async fn build(&self, request: EngineRequest) -> Result<EngineOutput> {
        let plugins: Vec<SharedPluginable> = vec![
            Arc::new(ResolverHooks::new(Arc::clone(&request.resolver))),
            Arc::new(RawLoaderPlugin::new(Arc::clone(&request.resolver))),
        ];

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(Self::options(&request))
            .with_plugins(plugins)
            .build()
            .map_err(|e| Error::from_rolldown_batch(&e, &request.resolver.failures()))?;

        let bundle = bundler
            .generate()
            .await
            .map_err(|e| Error::from_rolldown_batch(&e, &request.resolver.failures()))?;

        let code = bundle
            .assets
            .iter()
            .find_map(|output| match output {
                Output::Chunk(chunk) if chunk.is_entry => Some(chunk.code.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                Error::Engine(format!(
                    "no entry chunk produced for {}",
                    request.entry.display()
                ))
            })?;

        Ok(EngineOutput {
            code,
            watch_files: request.resolver.watch_files(),
        })
    }
}
