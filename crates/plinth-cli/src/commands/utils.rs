//! Shared utilities for command implementations.

use crate::error::{CliError, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Validate that a folder to bundle exists.
pub fn validate_folder(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }
    Ok(())
}

/// Token cancelled on the first Ctrl-C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::debug!("received Ctrl-C, shutting down"),
            Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
        }
        trigger.cancel();
    });
    token
}
