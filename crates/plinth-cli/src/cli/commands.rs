use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::*;
use crate::cli::validation::parse_loader_mapping;

/// Available Plinth subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build plugin manifests
    ///
    /// Compiles every function and dependency of each manifest, inlines its
    /// assets and imported manifests, and writes `<DIST>/<manifest>.json`.
    Build(BuildArgs),

    /// Bundle a folder of web assets
    ///
    /// Writes every file under DIR into OUTPUT as a JSON object of
    /// `path -> data URL`.
    Bundle(BundleArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Manifests to build
    ///
    /// Examples:
    ///   plinth build plugs/core.plug.yaml
    ///   plinth build plugs/*.plug.yaml --dist dist
    #[arg(required = true, value_name = "MANIFEST")]
    pub manifests: Vec<PathBuf>,

    /// Output directory for artifacts
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dist: Option<PathBuf>,

    /// Skip minification
    #[arg(long)]
    pub debug: bool,

    /// Refetch imported manifests instead of using the cache
    #[arg(long)]
    pub reload: bool,

    /// Print a summary of each artifact
    #[arg(long)]
    pub info: bool,

    /// Rebuild when files next to the manifests change
    #[arg(short, long)]
    pub watch: bool,

    /// Import map locator (path or URL)
    ///
    /// Defaults to `import_map.json` in the working directory when present.
    #[arg(long = "importmap", value_name = "LOCATOR")]
    pub import_map: Option<String>,

    /// Module loading strategy
    #[arg(long, value_enum, value_name = "LOADER")]
    pub loader: Option<Loader>,

    /// Loader for a file extension, e.g. `.txt=text` (repeatable)
    #[arg(long = "file-loader", value_parser = parse_loader_mapping, value_name = "EXT=KIND")]
    pub file_loaders: Vec<(String, LoaderKind)>,

    /// Directory for cached imported manifests
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Path to a config file (defaults to ./plinth.config.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for the bundle command
#[derive(Args, Debug, Clone)]
pub struct BundleArgs {
    /// Folder to bundle
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Output JSON file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Rebundle when files in DIR change
    #[arg(short, long)]
    pub watch: bool,

    /// Quiet period before rebundling in watch mode, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Path to a config file (defaults to ./plinth.config.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
