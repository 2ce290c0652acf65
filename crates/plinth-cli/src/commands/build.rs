//! Build command implementation.
//!
//! Implements `plinth build`: loads configuration, then builds every manifest
//! once or keeps rebuilding them in watch mode.

use std::path::{Component, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use plinth_bundler::{
    BuildOrchestrator, Compiler, DenoInfoOracle, Fetcher, HttpFetcher, ManifestLoader,
    RolldownEngine,
};

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::config::PlinthConfig;
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the build command.
///
/// 1. Load and validate configuration (CLI > Env > File > Defaults)
/// 2. Build all manifests, or build and watch with `--watch`
/// 3. Print a summary; any failed manifest, including one that cannot be
///    read, makes the command fail without stopping the others
pub async fn execute(args: BuildArgs) -> Result<()> {
    let config = PlinthConfig::load_for_build(&args)?;
    config.validate()?;

    let orchestrator = Arc::new(orchestrator(&config));

    if args.watch {
        ui::info(&format!(
            "Watching {} manifest(s), press Ctrl-C to stop",
            args.manifests.len()
        ));
        let shutdown = utils::shutdown_on_ctrl_c();
        orchestrator
            .watch(args.manifests, config.dist.clone(), shutdown)
            .await?;
        ui::info("Stopped watching");
        return Ok(());
    }

    let start = Instant::now();
    let report = orchestrator
        .build_all(&args.manifests, &config.dist)
        .await?
        .ok_or_else(|| CliError::Custom("Another build is already running".to_string()))?;
    ui::print_build_summary(&report, start.elapsed());

    if !report.is_success() {
        return Err(CliError::Build {
            failed: report.failed.len(),
            total: args.manifests.len(),
        });
    }

    ui::success(&format!(
        "Built {} manifest(s) into {}",
        report.built.len(),
        config.dist.display()
    ));
    Ok(())
}

/// Wire the pipeline for `config`: Rolldown engine, HTTP fetcher, and the
/// configured loader strategy.
pub fn orchestrator(config: &PlinthConfig) -> BuildOrchestrator {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new());
    let compiler = Compiler::new(Arc::new(RolldownEngine::new()), Arc::clone(&fetcher))
        .with_strategy(config.strategy())
        .with_oracle(Arc::new(DenoInfoOracle::new(&config.deno_path)));
    let loader = ManifestLoader::new(Arc::new(compiler), fetcher, config.build_options());

    BuildOrchestrator::new(loader).with_ignore_patterns(watch_ignore(config))
}

/// Configured ignore patterns plus the import cache directory, which the build
/// itself writes to.
fn watch_ignore(config: &PlinthConfig) -> Vec<String> {
    let mut patterns = config.watch_ignore.clone();
    let cache_segment = config
        .cache_dir
        .components()
        .rev()
        .find_map(|component| match component {
            Component::Normal(name) => Some(PathBuf::from(name)),
            _ => None,
        });
    if let Some(segment) = cache_segment.and_then(|s| s.to_str().map(str::to_string)) {
        if !patterns.contains(&segment) {
            patterns.push(segment);
        }
    }
    patterns
}
