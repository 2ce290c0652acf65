//! Command implementations for the Plinth CLI.
//!
//! - [`build`] - Build plugin manifests into artifacts
//! - [`bundle`] - Bundle a folder of web assets
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod build;
pub mod bundle;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use bundle::execute as bundle_execute;
