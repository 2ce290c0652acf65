use crate::config::PlinthConfig;
use crate::error::{ConfigError, Result};

/// Validate a custom loader extension such as `.txt`.
pub fn validate_loader_extension(ext: &str) -> Result<()> {
    if ext.len() < 2 || !ext.starts_with('.') {
        return Err(ConfigError::InvalidValue {
            field: "loaders".to_string(),
            value: ext.to_string(),
            hint: "Loader extensions start with a dot, e.g. \".txt\"".to_string(),
        }
        .into());
    }
    Ok(())
}

impl PlinthConfig {
    /// Validate settings used by `plinth build`.
    pub fn validate(&self) -> Result<()> {
        if self.dist.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "dist".to_string(),
                value: String::new(),
                hint: "Provide an output directory".to_string(),
            }
            .into());
        }

        for ext in self.loaders.keys() {
            validate_loader_extension(ext)?;
        }

        Ok(())
    }

    /// Validate settings used by `plinth bundle`.
    pub fn validate_for_bundle(&self, watch: bool) -> Result<()> {
        if watch && self.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "debounceMs".to_string(),
                value: "0".to_string(),
                hint: "Folder watching needs a quiet period of at least 1 ms".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
