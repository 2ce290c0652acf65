//! Logging setup for the Plinth CLI.
//!
//! # Example
//!
//! ```rust,no_run
//! use plinth::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Starting build");
//! ```

use plinth_bundler::logging::{self, LogConfig, LogLevel};

/// Level chosen by the global flags; `None` defers to `RUST_LOG`.
///
/// `--verbose` wins over `--quiet`.
pub fn level_for(verbose: bool, quiet: bool) -> Option<LogLevel> {
    if verbose {
        Some(LogLevel::Debug)
    } else if quiet {
        Some(LogLevel::Error)
    } else {
        None
    }
}

/// Initialize the tracing subscriber. Call once, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    logging::init_with(LogConfig {
        level: level_for(verbose, quiet),
        ansi: !no_color && should_use_colors(),
    });
}

/// Whether log output should be colored.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
