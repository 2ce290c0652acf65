//! Build engine abstraction.
//!
//! The compiler talks to the bundler through [`BuildEngine`]: one request in, one
//! self-contained script out. [`RolldownEngine`] is the production implementation.

mod plugin;
mod rolldown_engine;

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::resolve::ModuleResolver;

pub use plugin::{RawLoaderPlugin, ResolverHooks};
pub use rolldown_engine::RolldownEngine;

/// A single bundling request.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// Entry module on disk.
    pub entry: PathBuf,
    /// Working directory of the build.
    pub cwd: PathBuf,
    /// Global the IIFE output assigns its exports to.
    pub global_name: String,
    pub minify: bool,
    /// Resolution hooks, external prefixes and custom loaders for this build.
    pub resolver: Arc<ModuleResolver>,
}

/// Compiled entry chunk plus the local files the build read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub code: String,
    pub watch_files: Vec<PathBuf>,
}

/// General-purpose JS/TS bundler.
#[async_trait]
pub trait BuildEngine: Send + Sync + Debug {
    async fn build(&self, request: EngineRequest) -> Result<EngineOutput>;
}
