//! Miette report conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert a [`CliError`] into a miette report.
///
/// Pipeline errors keep their diagnostic code and help text.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundler(e) => bundler_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a pipeline error into a miette report through its `Diagnostic` impl.
pub fn bundler_error_to_miette(err: plinth_bundler::Error) -> Report {
    Report::new(err)
}
