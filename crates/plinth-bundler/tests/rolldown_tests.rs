//! End-to-end compiles through the Rolldown engine.

mod helpers;

use std::sync::Arc;

use helpers::{CountingFetcher, write_file};
use plinth_bundler::{
    BuildOptions, BuildOrchestrator, CompileOptions, Compiler, CustomLoader, EXPORT_BINDING,
    HttpFetcher, ManifestLoader, RolldownEngine,
};
use tempfile::TempDir;

fn rolldown_compiler(cwd: &std::path::Path) -> Compiler {
    Compiler::new(Arc::new(RolldownEngine::new()), CountingFetcher::new()).with_cwd(cwd)
}

fn rolldown_loader(cwd: &std::path::Path, options: BuildOptions) -> ManifestLoader {
    let fetcher = Arc::new(HttpFetcher::new());
    let compiler = Compiler::new(Arc::new(RolldownEngine::new()), fetcher.clone()).with_cwd(cwd);
    ManifestLoader::new(Arc::new(compiler), fetcher, options)
}

fn debug_options(root: &std::path::Path) -> BuildOptions {
    BuildOptions {
        debug: true,
        cache_dir: root.join(".plinth-cache"),
        ..Default::default()
    }
}

#[tokio::test]
async fn compiles_a_local_typescript_function() {
    let dir = TempDir::new().expect("temp dir");
    write_file(
        dir.path(),
        "lib/format.ts",
        "export function shout(s: string): string {\n  return s.toUpperCase() + \"!\";\n}\n",
    );
    let source = write_file(
        dir.path(),
        "greet.ts",
        "import { shout } from \"./lib/format.ts\";\nexport function greet(name: string) {\n  return shout(`hello ${name}`);\n}\nexport function unused() {\n  return 1;\n}\n",
    );

    let options = CompileOptions {
        debug: true,
        ..Default::default()
    };
    let script = rolldown_compiler(dir.path())
        .compile(&source, Some("greet"), &options)
        .await
        .expect("compile");

    assert!(script.starts_with("(() => {"));
    assert!(script.contains(EXPORT_BINDING));
    assert!(script.contains("toUpperCase"));
    assert!(!script.contains(": string"));
}

#[tokio::test]
async fn text_loader_inlines_file_contents() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "banner.txt", "Welcome aboard");
    let source = write_file(
        dir.path(),
        "banner.ts",
        "import banner from \"./banner.txt\";\nexport function show() {\n  return banner;\n}\n",
    );

    let mut options = CompileOptions {
        debug: true,
        ..Default::default()
    };
    options
        .custom_loaders
        .insert(".txt".to_string(), CustomLoader::Text);

    let script = rolldown_compiler(dir.path())
        .compile(&source, Some("show"), &options)
        .await
        .expect("compile");

    assert!(script.contains("Welcome aboard"));
}

#[tokio::test]
async fn unresolvable_import_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let source = write_file(
        dir.path(),
        "broken.ts",
        "import { nope } from \"./missing.ts\";\nexport const value = nope;\n",
    );

    let err = rolldown_compiler(dir.path())
        .compile(&source, Some("value"), &CompileOptions::default())
        .await
        .expect_err("missing import");

    let message = err.to_string();
    assert!(message.contains("missing.ts"), "{message}");
    assert!(!message.contains("BuildDiagnostic"), "{message}");
}

#[tokio::test]
async fn relative_import_map_is_read_from_the_working_directory() {
    let dir = TempDir::new().expect("temp dir");
    write_file(
        dir.path(),
        "import_map.json",
        r#"{"imports": {"shout": "./lib/format.ts"}}"#,
    );
    write_file(
        dir.path(),
        "lib/format.ts",
        "export function shout(s: string): string {\n  return s.toUpperCase();\n}\n",
    );
    write_file(
        dir.path(),
        "plugs/greet.ts",
        "import { shout } from \"shout\";\nexport function greet() {\n  return shout(\"mapped\");\n}\n",
    );
    let manifest = write_file(
        dir.path(),
        "plugs/demo.plug.yaml",
        "name: demo\nfunctions:\n  greet:\n    path: ./greet.ts:greet\n",
    );

    let options = BuildOptions {
        import_map: Some("import_map.json".to_string()),
        ..debug_options(dir.path())
    };
    let report = rolldown_loader(dir.path(), options)
        .build_manifest(&manifest, &dir.path().join("dist"))
        .await
        .expect("build");

    let artifact = std::fs::read_to_string(&report.output).expect("artifact");
    assert!(artifact.contains("toUpperCase"));
    assert!(artifact.contains("mapped"));
}

#[tokio::test]
async fn missing_function_source_fails_only_its_manifest() {
    let dir = TempDir::new().expect("temp dir");
    write_file(
        dir.path(),
        "greet.ts",
        "export function sayHi() {\n  return \"hi\";\n}\n",
    );
    let good_a = write_file(
        dir.path(),
        "a.plug.yaml",
        "name: a\nfunctions:\n  hi:\n    path: ./greet.ts:sayHi\n",
    );
    let broken = write_file(
        dir.path(),
        "broken.plug.yaml",
        "name: broken\nfunctions:\n  run:\n    path: ./missing.ts:run\n",
    );
    let good_b = write_file(
        dir.path(),
        "b.plug.yaml",
        "name: b\nfunctions:\n  hi:\n    path: ./greet.ts:sayHi\n",
    );
    let out = dir.path().join("dist");

    let orchestrator =
        BuildOrchestrator::new(rolldown_loader(dir.path(), debug_options(dir.path())));
    let report = orchestrator
        .build_all(&[good_a, broken.clone(), good_b], &out)
        .await
        .expect("batch")
        .expect("not skipped");

    assert_eq!(report.built.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].manifest, broken);
    let message = report.failed[0].error.to_string();
    assert!(message.contains("missing.ts"), "{message}");
    assert!(!message.contains("BuildDiagnostic"), "{message}");

    assert!(out.join("a.plug.json").exists());
    assert!(out.join("b.plug.json").exists());
    assert!(!out.join("broken.plug.json").exists());
}
