use codemap_core::{canonical_root, AnalyzerConfig, CallResolution, CodeMapError, NodeKind};
use codemap_graph::DependencyAnalyzer;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn file_without_imports_has_no_children() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "solo.py", "def only():\n    return 1\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let tree = analyzer
        .analyze_file_dependency_tree("solo.py")
        .await
        .unwrap();

    assert!(analyzer.is_initialized());
    assert_eq!(tree.node_type, NodeKind::File);
    assert_eq!(tree.name, "solo.py");
    assert!(tree.children.is_empty());
    assert_eq!(tree.functions.len(), 1);
    assert_eq!(tree.functions[0].line_number, Some(1));
}

#[tokio::test]
async fn python_import_cycle_is_flagged() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "import b\n\ndef fa():\n    b.fb()\n");
    write(dir.path(), "b.py", "import a\n\ndef fb():\n    a.fa()\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let tree = analyzer.analyze_file_dependency_tree("a.py").await.unwrap();

    assert_eq!(tree.children.len(), 1);
    let b = &tree.children[0];
    assert_eq!(b.name, "b.py");
    assert!(!b.is_cyclic);
    assert_eq!(b.children.len(), 1);
    assert_eq!(b.children[0].name, "a.py");
    assert!(b.children[0].is_cyclic);
    assert!(b.children[0].children.is_empty());
}

#[tokio::test]
async fn javascript_diamond_visits_shared_module_twice() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/a.js", "import b from './b';\nimport c from './c';\n");
    write(dir.path(), "src/b.js", "import d from './d';\n");
    write(dir.path(), "src/c.js", "const d = require('./d');\n");
    write(dir.path(), "src/d.js", "export function leaf() { return 1; }\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let tree = analyzer
        .analyze_file_dependency_tree("src/a.js")
        .await
        .unwrap();

    let names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["b.js", "c.js"]);
    let ds = tree.find_all("d.js");
    assert_eq!(ds.len(), 2);
    assert!(ds.iter().all(|d| !d.is_cyclic));
}

#[tokio::test]
async fn go_package_imports_and_call_trees() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.go",
        "package main\n\nimport \"pkgb\"\n\nfunc Foo() {\n\tBar()\n}\n",
    );
    write(dir.path(), "pkgb/b.go", "package pkgb\n\nfunc Bar() {\n\tBaz()\n}\n\nfunc Baz() {}\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let tree = analyzer.analyze_file_dependency_tree("a.go").await.unwrap();
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.children[0].name, "b.go");
    assert_eq!(tree.functions[0].name, "Foo");
    assert_eq!(tree.functions[0].line_number, Some(5));

    let calls = analyzer
        .analyze_function_dependency_tree("a.go", "Foo")
        .await
        .unwrap();
    assert_eq!(calls.node_type, NodeKind::Function);
    assert_eq!(calls.line_number, Some(5));
    assert_eq!(calls.children.len(), 1);
    let bar = &calls.children[0];
    assert_eq!(bar.name, "Bar");
    assert_eq!(bar.line_number, Some(3));
    assert_eq!(bar.children[0].name, "Baz");
    assert_eq!(bar.children[0].line_number, Some(7));

    let root = canonical_root(dir.path());
    assert_eq!(
        analyzer.file_dependencies("a.go"),
        vec![root.join("pkgb/b.go")]
    );
    let full_name = format!("{}:Bar", root.join("pkgb/b.go").display());
    assert_eq!(
        analyzer.file_for_function(&full_name),
        Some(root.join("pkgb/b.go"))
    );
    assert_eq!(analyzer.file_count(), 2);
}

#[tokio::test]
async fn recursive_functions_terminate() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "rec.py",
        "def ping(n):\n    return pong(n - 1)\n\ndef pong(n):\n    return ping(n - 1)\n",
    );

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let tree = analyzer
        .analyze_function_dependency_tree("rec.py", "ping")
        .await
        .unwrap();

    assert_eq!(tree.depth(), 2);
    let back = &tree.children[0].children[0];
    assert_eq!(back.name, "ping");
    assert!(back.is_cyclic);
}

#[tokio::test]
async fn strict_resolution_skips_ambiguous_calls() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "main.py", "def run():\n    helper()\n");
    write(dir.path(), "one.py", "def helper():\n    pass\n");
    write(dir.path(), "two.py", "def helper():\n    pass\n");

    let lenient = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let tree = lenient
        .analyze_function_dependency_tree("main.py", "run")
        .await
        .unwrap();
    assert_eq!(tree.children.len(), 1);
    assert!(tree.children[0].full_path.ends_with("one.py:helper"));

    let config = AnalyzerConfig {
        call_resolution: CallResolution::Strict,
        ..AnalyzerConfig::default()
    };
    let strict = DependencyAnalyzer::new(dir.path(), config);
    let tree = strict
        .analyze_function_dependency_tree("main.py", "run")
        .await
        .unwrap();
    assert!(tree.children.is_empty());
}

#[tokio::test]
async fn snapshot_restores_identical_trees() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "import b\n\ndef fa():\n    fb()\n");
    write(dir.path(), "b.py", "def fb():\n    pass\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    analyzer.initialize().await.unwrap();
    let before = analyzer.analyze_file_dependency_tree("a.py").await.unwrap();
    let state_file = dir.path().join("state/analyzer.bin");
    analyzer.save_to_file(&state_file).unwrap();

    let restored = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    restored.load_from_file(&state_file).unwrap();
    assert!(restored.is_initialized());
    assert_eq!(
        restored.analyze_file_dependency_tree("a.py").await.unwrap(),
        before
    );
    assert_eq!(
        restored.functions_in_file("a.py"),
        analyzer.functions_in_file("a.py")
    );
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def fa():\n    pass\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    analyzer.initialize().await.unwrap();
    write(dir.path(), "late.py", "def late():\n    pass\n");
    analyzer.initialize().await.unwrap();

    assert_eq!(analyzer.file_count(), 1);
    assert!(analyzer.functions_in_file("late.py").is_empty());
}

#[tokio::test]
async fn concurrent_initialize_calls_share_one_scan() {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        write(dir.path(), &format!("m{i}.py"), "def f():\n    pass\n");
    }
    let config = AnalyzerConfig {
        max_concurrent_files: 2,
        ..AnalyzerConfig::default()
    };
    let analyzer = DependencyAnalyzer::new(dir.path(), config);

    let (a, b) = tokio::join!(analyzer.initialize(), analyzer.initialize());
    a.unwrap();
    b.unwrap();
    assert_eq!(analyzer.file_count(), 20);
}

#[tokio::test]
async fn cancelled_scan_leaves_analyzer_uninitialized() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.py", "def fa():\n    pass\n");

    let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
    let token = CancellationToken::new();
    token.cancel();

    let err = analyzer
        .initialize_with_cancellation(token)
        .await
        .unwrap_err();
    assert!(matches!(err, CodeMapError::Cancelled));
    assert!(!analyzer.is_initialized());

    analyzer.initialize().await.unwrap();
    assert!(analyzer.is_initialized());
}

#[test]
fn missing_root_fails_to_initialize() {
    let dir = TempDir::new().unwrap();
    let analyzer = DependencyAnalyzer::new(dir.path().join("absent"), AnalyzerConfig::default());
    assert!(tokio_test::block_on(analyzer.initialize()).is_err());
    assert!(!analyzer.is_initialized());
}
