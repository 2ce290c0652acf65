use std::path::PathBuf;

pub fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_cache_dir() -> PathBuf {
    PathBuf::from(plinth_bundler::manifest::DEFAULT_CACHE_DIR)
}

pub fn default_deno_path() -> PathBuf {
    PathBuf::from("deno")
}

pub fn default_debounce_ms() -> u64 {
    100
}
