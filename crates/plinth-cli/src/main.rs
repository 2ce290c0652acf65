//! Plinth CLI - builds plugin manifests into self-contained artifacts.
//!
//! This is the main entry point for the Plinth CLI. It handles command-line
//! argument parsing, logging initialization, and command dispatch.

use clap::Parser;
use miette::Result;
use plinth::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Bundle(bundle_args) => commands::bundle_execute(bundle_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
