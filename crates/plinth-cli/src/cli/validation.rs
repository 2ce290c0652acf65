use crate::cli::enums::LoaderKind;
use clap::ValueEnum;

/// Parse an `EXT=KIND` loader mapping such as `.txt=text`.
///
/// The extension must start with a dot; the kind is one of `text`, `base64` or
/// `json`.
pub fn parse_loader_mapping(s: &str) -> Result<(String, LoaderKind), String> {
    let (ext, kind) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected EXT=KIND (e.g. .txt=text), got '{}'", s))?;

    if ext.len() < 2 || !ext.starts_with('.') {
        return Err(format!(
            "Loader extension must start with a dot (e.g. .txt): '{}'",
            ext
        ));
    }

    let kind = LoaderKind::from_str(kind, true)
        .map_err(|_| format!("Unknown loader '{}': expected text, base64 or json", kind))?;

    Ok((ext.to_string(), kind))
}
