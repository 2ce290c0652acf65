//! Command-line interface definition for Plinth.
//!
//! # Command Structure
//!
//! - `plinth build` - Build plugin manifests into JSON artifacts
//! - `plinth bundle` - Bundle a folder of web assets into one JSON file

mod commands;
pub mod enums;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, BundleArgs, Command};
pub use enums::*;
pub use validation::parse_loader_mapping;

/// Plinth - build plugin manifests into self-contained artifacts
#[derive(Parser, Debug)]
#[command(
    name = "plinth",
    version,
    about = "Build plugin manifests into self-contained artifacts",
    long_about = "Plinth reads plugin manifests (*.plug.yaml), compiles their functions and\n\
                  dependencies into standalone scripts, inlines their assets and writes one\n\
                  JSON artifact per manifest."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
