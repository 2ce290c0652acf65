//! Error handling for the Plinth CLI.
//!
//! Library failures arrive as [`plinth_bundler::Error`] and keep their
//! diagnostics; everything the CLI itself detects (bad flags, bad config,
//! failed batches) is a [`CliError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use plinth::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Pass the path of a *.plug.yaml file")
//! }
//! ```

mod report;

use std::path::PathBuf;
use thiserror::Error;

pub use report::{bundler_error_to_miette, cli_error_to_miette};

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (unreadable file, invalid values)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// One or more manifests failed to build
    #[error("Build failed: {failed} of {total} manifest(s) did not build")]
    Build {
        /// Manifests that failed
        failed: usize,
        /// Manifests in the batch
        total: usize,
    },

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Watch loop errors
    #[error("File watcher error: {0}")]
    Watch(String),

    /// Errors from the pipeline
    #[error(transparent)]
    Bundler(#[from] plinth_bundler::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Explicit config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a plinth.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// Config sources could not be merged into a valid configuration
    #[error("Invalid configuration: {0}\n\nHint: Check plinth.config.json and PLINTH_* variables")]
    Extract(String),

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint line to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
