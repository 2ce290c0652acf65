//! Type-state manifest.
//!
//! Each resolution stage consumes a [`Manifest`] and returns a new one with a
//! single field's type changed. Only [`ResolvedManifest`] can be serialized as an
//! artifact.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::FunctionDef;
use crate::assets::AssetBundle;

/// Dependency name to module locator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyLocators(pub IndexMap<String, String>);

/// Dependency name to compiled module script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledDependencies(pub IndexMap<String, String>);

/// Asset glob patterns relative to the manifest directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetPatterns(pub Vec<String>);

/// Locators of imported, already-built manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportLocators(pub Vec<String>);

/// Imported manifest documents, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedImports(pub Vec<Value>);

impl ResolvedImports {
    /// Dependency names declared by the imported manifests.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter_map(|doc| doc.get("dependencies").and_then(Value::as_object))
            .flat_map(|deps| deps.keys().map(String::as_str))
    }
}

/// Function definitions still pointing at source files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionSources(pub IndexMap<String, FunctionDef>);

/// Function definitions carrying compiled code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledFunctions(pub IndexMap<String, FunctionDef>);

/// A plugin manifest at some resolution stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest<D, A, I, F> {
    pub name: String,
    pub dependencies: D,
    pub assets: A,
    pub imports: I,
    pub functions: F,
    /// Unrecognized top-level keys, passed through to the artifact.
    pub extra: IndexMap<String, Value>,
    /// Directory relative paths in the manifest resolve against.
    pub base_dir: PathBuf,
}

pub type Named = Manifest<DependencyLocators, AssetPatterns, ImportLocators, FunctionSources>;
pub type DependenciesResolved =
    Manifest<CompiledDependencies, AssetPatterns, ImportLocators, FunctionSources>;
pub type AssetsResolved =
    Manifest<CompiledDependencies, AssetBundle, ImportLocators, FunctionSources>;
pub type ImportsResolved =
    Manifest<CompiledDependencies, AssetBundle, ResolvedImports, FunctionSources>;
pub type ResolvedManifest =
    Manifest<CompiledDependencies, AssetBundle, ResolvedImports, CompiledFunctions>;

impl<D, A, I, F> Manifest<D, A, I, F> {
    pub fn with_dependencies<D2>(self, dependencies: D2) -> Manifest<D2, A, I, F> {
        Manifest {
            name: self.name,
            dependencies,
            assets: self.assets,
            imports: self.imports,
            functions: self.functions,
            extra: self.extra,
            base_dir: self.base_dir,
        }
    }

    pub fn with_assets<A2>(self, assets: A2) -> Manifest<D, A2, I, F> {
        Manifest {
            name: self.name,
            dependencies: self.dependencies,
            assets,
            imports: self.imports,
            functions: self.functions,
            extra: self.extra,
            base_dir: self.base_dir,
        }
    }

    pub fn with_imports<I2>(self, imports: I2) -> Manifest<D, A, I2, F> {
        Manifest {
            name: self.name,
            dependencies: self.dependencies,
            assets: self.assets,
            imports,
            functions: self.functions,
            extra: self.extra,
            base_dir: self.base_dir,
        }
    }

    pub fn with_functions<F2>(self, functions: F2) -> Manifest<D, A, I, F2> {
        Manifest {
            name: self.name,
            dependencies: self.dependencies,
            assets: self.assets,
            imports: self.imports,
            functions,
            extra: self.extra,
            base_dir: self.base_dir,
        }
    }
}

impl Serialize for ResolvedManifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("dependencies", &self.dependencies)?;
        map.serialize_entry("assets", &self.assets)?;
        map.serialize_entry("imports", &self.imports)?;
        map.serialize_entry("functions", &self.functions)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Resolution stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Parsed,
    Named,
    DependenciesResolved,
    AssetsResolved,
    ImportsResolved,
    FunctionsResolved,
    Finalized,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Parsed => "parsed",
            Stage::Named => "name-validated",
            Stage::DependenciesResolved => "dependencies-resolved",
            Stage::AssetsResolved => "assets-resolved",
            Stage::ImportsResolved => "imports-resolved",
            Stage::FunctionsResolved => "functions-resolved",
            Stage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_manifest_serializes_known_fields_then_extra() {
        let mut extra = IndexMap::new();
        extra.insert("version".to_string(), json!(2));

        let mut functions = IndexMap::new();
        functions.insert(
            "greet".to_string(),
            FunctionDef {
                code: Some("(() => {})()".to_string()),
                ..Default::default()
            },
        );

        let manifest: ResolvedManifest = Manifest {
            name: "demo".to_string(),
            dependencies: CompiledDependencies::default(),
            assets: AssetBundle::new(),
            imports: ResolvedImports::default(),
            functions: CompiledFunctions(functions),
            extra,
            base_dir: PathBuf::from("/work"),
        };

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "demo",
                "dependencies": {},
                "assets": {},
                "imports": [],
                "functions": {"greet": {"code": "(() => {})()"}},
                "version": 2
            })
        );
    }

    #[test]
    fn test_imported_dependency_names() {
        let imports = ResolvedImports(vec![
            json!({"name": "core", "dependencies": {"$sb": "x", "yaml": "y"}}),
            json!({"name": "bare"}),
        ]);
        assert_eq!(
            imports.dependency_names().collect::<Vec<_>>(),
            vec!["$sb", "yaml"]
        );
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::Named < Stage::DependenciesResolved);
        assert!(Stage::ImportsResolved < Stage::FunctionsResolved);
        assert_eq!(Stage::AssetsResolved.to_string(), "assets-resolved");
    }
}
