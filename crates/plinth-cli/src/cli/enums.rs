use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How remote and local modules are loaded during compilation
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Default, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    /// Ask `deno info` for the module graph and read its local copies
    ///
    /// Requires a Deno executable (see `denoPath`). Remote modules must have
    /// been cached by it.
    #[value(name = "oracle", alias = "deno")]
    #[serde(alias = "deno")]
    Oracle,

    /// Read local files and fetch remote modules directly
    #[default]
    #[value(name = "portable")]
    Portable,
}

/// Loader for a non-code file extension
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    /// Default export is the file contents as a string
    #[value(name = "text")]
    Text,

    /// Default export is the base64-encoded file contents
    #[value(name = "base64")]
    Base64,

    /// The file is parsed as a JSON module
    #[value(name = "json")]
    Json,
}
