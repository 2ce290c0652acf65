use indexmap::IndexMap;
use plinth_bundler::{BuildOptions, CustomLoader, LoaderStrategy};

use crate::cli::{Loader, LoaderKind};
use crate::config::PlinthConfig;

impl From<Loader> for LoaderStrategy {
    fn from(loader: Loader) -> Self {
        match loader {
            Loader::Oracle => LoaderStrategy::Oracle,
            Loader::Portable => LoaderStrategy::Portable,
        }
    }
}

impl From<LoaderKind> for CustomLoader {
    fn from(kind: LoaderKind) -> Self {
        match kind {
            LoaderKind::Text => CustomLoader::Text,
            LoaderKind::Base64 => CustomLoader::Base64,
            LoaderKind::Json => CustomLoader::Json,
        }
    }
}

impl PlinthConfig {
    /// Per-build options for the manifest loader.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            debug: self.debug,
            reload: self.reload,
            info: self.info,
            import_map: self.import_map.clone(),
            custom_loaders: self
                .loaders
                .iter()
                .map(|(ext, kind)| (ext.clone(), CustomLoader::from(*kind)))
                .collect::<IndexMap<_, _>>(),
            cache_dir: self.cache_dir.clone(),
        }
    }

    pub fn strategy(&self) -> LoaderStrategy {
        self.loader.into()
    }
}
