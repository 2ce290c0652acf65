//! Plinth CLI - builds plugin manifests into self-contained artifacts.
//!
//! This crate provides the command-line interface for `plinth-bundler`:
//!
//! - [`cli`] - Argument parsing with clap
//! - [`config`] - Layered configuration (defaults, config file, environment, flags)
//! - [`error`] - CLI error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status messages
//! - [`commands`] - `build` and `bundle` command implementations
//!
//! # Example
//!
//! ```rust,no_run
//! use plinth::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
