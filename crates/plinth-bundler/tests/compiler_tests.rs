//! Function compiler tests against a recording engine.

mod helpers;

use helpers::{CountingFetcher, RecordingEngine, test_compiler, write_file};
use plinth_bundler::{CompileOptions, EXPORT_BINDING, Error};
use tempfile::TempDir;

#[tokio::test]
async fn compile_imports_only_the_requested_symbol() {
    let dir = TempDir::new().expect("temp dir");
    let source = write_file(dir.path(), "greet.ts", "export function sayHi() {}\n");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    let script = compiler
        .compile(&source, Some("sayHi"), &CompileOptions::default())
        .await
        .expect("compile");

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert!(call.source.starts_with("import { sayHi } from \"file://"));
    assert!(call.source.contains("greet.ts\""));
    assert!(call.source.ends_with("export default sayHi;\n"));
    assert_ne!(call.entry, source);

    assert!(script.starts_with("(() => { var __plinth_export = "));
    assert!(script.ends_with(&format!("\nreturn {};}})()", EXPORT_BINDING)));
}

#[tokio::test]
async fn temporary_entry_is_removed_after_success_and_failure() {
    let dir = TempDir::new().expect("temp dir");
    let good = write_file(dir.path(), "good.ts", "export const ok = 1;\n");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    compiler
        .compile(&good, Some("ok"), &CompileOptions::default())
        .await
        .expect("compile");
    // Symbols spelled SYNTAX_ERROR make the fake engine fail.
    let err = compiler
        .compile(&good, Some("SYNTAX_ERROR"), &CompileOptions::default())
        .await
        .expect_err("engine failure must propagate");
    assert!(matches!(err, Error::Engine(_)));

    for call in engine.calls() {
        assert!(!call.entry.exists(), "{} left behind", call.entry.display());
    }
}

#[tokio::test]
async fn compile_without_symbol_uses_the_file_as_entry() {
    let dir = TempDir::new().expect("temp dir");
    let source = write_file(dir.path(), "main.ts", "console.log('main');\n");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    compiler
        .compile(&source, None, &CompileOptions::default())
        .await
        .expect("compile");

    let call = &engine.calls()[0];
    assert_eq!(call.entry, source);
    assert!(source.exists());
}

#[tokio::test]
async fn debug_disables_minification_and_externals_reach_the_resolver() {
    let dir = TempDir::new().expect("temp dir");
    let source = write_file(dir.path(), "greet.ts", "export const a = 1;\n");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    let release = CompileOptions {
        externals: vec!["$sb".to_string()],
        ..Default::default()
    };
    let debug = CompileOptions {
        debug: true,
        ..Default::default()
    };
    compiler.compile(&source, Some("a"), &release).await.expect("compile");
    compiler.compile(&source, Some("a"), &debug).await.expect("compile");

    let calls = engine.calls();
    assert!(calls[0].minify);
    assert_eq!(calls[0].externals, vec!["$sb".to_string()]);
    assert!(!calls[1].minify);
}

#[tokio::test]
async fn compile_module_reexports_everything() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "lib/util.ts", "export const x = 1;\n");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    compiler
        .compile_module(dir.path(), "./lib/util.ts", &CompileOptions::default())
        .await
        .expect("compile module");
    compiler
        .compile_module(
            dir.path(),
            "https://deno.land/x/yaml/mod.ts",
            &CompileOptions::default(),
        )
        .await
        .expect("compile remote module");

    let calls = engine.calls();
    assert!(calls[0].source.starts_with("export * from \"file://"));
    assert!(calls[0].source.contains("/lib/util.ts\";"));
    assert_eq!(
        calls[1].source,
        "export * from \"https://deno.land/x/yaml/mod.ts\";\n"
    );
}

#[tokio::test]
async fn sandbox_compile_stages_source_in_a_throwaway_directory() {
    let dir = TempDir::new().expect("temp dir");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    let script = compiler
        .sandbox_compile(
            "snippet.ts",
            "export default () => 42;\n",
            None,
            &CompileOptions::default(),
        )
        .await
        .expect("sandbox compile");

    let call = &engine.calls()[0];
    assert_eq!(call.source, "export default () => 42;\n");
    assert!(!call.entry.exists());
    assert!(script.contains("42"));
}

#[tokio::test]
async fn default_import_map_is_picked_up_from_the_working_directory() {
    let dir = TempDir::new().expect("temp dir");
    let source = write_file(dir.path(), "greet.ts", "export const a = 1;\n");
    let map = write_file(dir.path(), "import_map.json", r#"{"imports": {}}"#);
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    compiler
        .compile(&source, Some("a"), &CompileOptions::default())
        .await
        .expect("compile");
    compiler
        .compile(
            &source,
            Some("a"),
            &CompileOptions {
                import_map: Some("https://maps.example/map.json".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("compile");

    let calls = engine.calls();
    assert_eq!(
        calls[0].import_map.as_deref(),
        Some(map.to_string_lossy().as_ref())
    );
    assert_eq!(
        calls[1].import_map.as_deref(),
        Some("https://maps.example/map.json")
    );
}

#[tokio::test]
async fn relative_import_map_resolves_against_the_working_directory() {
    let dir = TempDir::new().expect("temp dir");
    let source = write_file(dir.path(), "plugs/greet.ts", "export const a = 1;\n");
    let engine = RecordingEngine::new();
    let compiler = test_compiler(engine.clone(), CountingFetcher::new(), dir.path());

    compiler
        .compile(
            &source,
            Some("a"),
            &CompileOptions {
                import_map: Some("maps/import_map.json".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("compile");

    let expected = dir.path().join("maps/import_map.json");
    assert_eq!(
        engine.calls()[0].import_map.as_deref(),
        Some(expected.to_string_lossy().as_ref())
    );
}
