use codemap_core::{
    is_supported_path, resolve_against, canonical_root, AnalyzerConfig, CodeMapError,
    DependencyTree, FunctionInfo, Result, ScanFailure,
};
use codemap_parser::{collect_source_files, profile_for_path, DiscoveryOptions};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::snapshot::{read_snapshot, write_snapshot};
use crate::state::{FileAnalysis, GraphState};
use crate::tree::{file_tree, function_tree, TreeLimits};

#[derive(Default)]
struct Shared {
    graph: GraphState,
    initialized: bool,
}

/// File and call dependency maps for one source tree.
///
/// The maps are built once by [`DependencyAnalyzer::initialize`] and only read afterwards.
/// Later source changes are not picked up; build a new analyzer to rescan.
pub struct DependencyAnalyzer {
    root: PathBuf,
    config: AnalyzerConfig,
    state: RwLock<Shared>,
    init_lock: Mutex<()>,
}

impl DependencyAnalyzer {
    pub fn new(root: impl AsRef<Path>, config: AnalyzerConfig) -> Self {
        Self {
            root: canonical_root(root.as_ref()),
            config,
            state: RwLock::new(Shared::default()),
            init_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    /// Scans the root once. Calls after a successful scan return immediately.
    pub async fn initialize(&self) -> Result<()> {
        self.initialize_with_cancellation(CancellationToken::new())
            .await
    }

    /// Like [`initialize`](Self::initialize), but stops admitting files once `cancel` fires.
    /// Files already being processed are allowed to finish before `Cancelled` is returned.
    pub async fn initialize_with_cancellation(&self, cancel: CancellationToken) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            debug!("Analyzer for {:?} already initialized", self.root);
            return Ok(());
        }

        let start = Instant::now();
        info!("Scanning {:?} for dependencies", self.root);

        let root = self.root.clone();
        let options = DiscoveryOptions::from(&self.config);
        let discovered = tokio::task::spawn_blocking(move || collect_source_files(&root, &options))
            .await
            .map_err(|e| CodeMapError::InvalidOperation(format!("file discovery panicked: {e}")))??;

        self.build_from(discovered.files, discovered.failures, &cancel, start)
            .await
    }

    /// Processes `files` and stores the maps built from them.
    ///
    /// Files that fail are reported together with `failures` from discovery, after every
    /// other file has finished. The partial maps are kept but the analyzer stays
    /// uninitialized, so the next query scans again.
    async fn build_from(
        &self,
        files: Vec<PathBuf>,
        mut failures: Vec<ScanFailure>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> Result<()> {
        let (graph, scan_failures, cancelled) = self.scan_files(files, cancel).await;
        if cancelled {
            warn!("Dependency scan of {:?} cancelled", self.root);
            return Err(CodeMapError::Cancelled);
        }
        failures.extend(scan_failures);
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        let file_count = graph.file_count();
        let function_count = graph.function_files.len();
        let mut shared = self.state.write();
        shared.graph = graph;
        if !failures.is_empty() {
            warn!(
                "Dependency scan of {:?} finished with {} failed file(s)",
                self.root,
                failures.len()
            );
            return Err(CodeMapError::Scan(failures));
        }
        shared.initialized = true;
        info!(
            "Dependency scan complete: {} files, {} functions in {:.2}s",
            file_count,
            function_count,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn scan_files(
        &self,
        files: Vec<PathBuf>,
        cancel: &CancellationToken,
    ) -> (GraphState, Vec<ScanFailure>, bool) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_files.max(1)));
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        for file in files {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        cancelled = true;
                        break;
                    }
                },
            };
            let root = self.root.clone();
            tasks.spawn(async move {
                let _permit = permit;
                process_file(root, file).await
            });
        }

        let mut graph = GraphState::default();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(analysis)) => graph.insert(analysis),
                Ok(Err(failure)) => {
                    warn!("Failed to process {:?}: {}", failure.path, failure.message);
                    failures.push(failure);
                }
                Err(e) => failures.push(ScanFailure::new(&self.root, e.to_string())),
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        (graph, failures, cancelled || cancel.is_cancelled())
    }

    /// File dependency tree rooted at `path`, which may be relative to the analyzer root.
    pub async fn analyze_file_dependency_tree(&self, path: impl AsRef<Path>) -> Result<DependencyTree> {
        self.ensure_initialized().await?;
        let path = self.resolve(path.as_ref());
        let shared = self.state.read();
        Ok(file_tree(&shared.graph, &path, self.config.max_file_depth))
    }

    /// Call tree rooted at `function_name` as defined in `file_path`.
    pub async fn analyze_function_dependency_tree(
        &self,
        file_path: impl AsRef<Path>,
        function_name: &str,
    ) -> Result<DependencyTree> {
        self.ensure_initialized().await?;
        let path = self.resolve(file_path.as_ref());
        let limits = TreeLimits {
            max_depth: self.config.max_function_depth,
            resolution: self.config.call_resolution,
        };
        let shared = self.state.read();
        Ok(function_tree(&shared.graph, &path, function_name, limits))
    }

    async fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        self.initialize().await
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        resolve_against(&self.root, path)
    }

    pub fn file_dependencies(&self, path: impl AsRef<Path>) -> Vec<PathBuf> {
        let path = self.resolve(path.as_ref());
        self.state
            .read()
            .graph
            .file_dependencies
            .get(&path)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn functions_in_file(&self, path: impl AsRef<Path>) -> Vec<FunctionInfo> {
        let path = self.resolve(path.as_ref());
        self.state
            .read()
            .graph
            .file_functions
            .get(&path)
            .cloned()
            .unwrap_or_default()
    }

    pub fn file_for_function(&self, full_name: &str) -> Option<PathBuf> {
        self.state.read().graph.function_files.get(full_name).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.state.read().graph.file_count()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let shared = self.state.read();
        write_snapshot(path.as_ref(), &shared.graph)
    }

    /// Replaces the maps with a saved snapshot and marks the analyzer initialized.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let graph = read_snapshot(path.as_ref())?;
        let mut shared = self.state.write();
        shared.graph = graph;
        shared.initialized = true;
        Ok(())
    }
}

async fn process_file(root: PathBuf, file: PathBuf) -> std::result::Result<FileAnalysis, ScanFailure> {
    let bytes = tokio::fs::read(&file)
        .await
        .map_err(|e| ScanFailure::new(&file, e.to_string()))?;
    let path = file.clone();
    tokio::task::spawn_blocking(move || {
        let text = String::from_utf8_lossy(&bytes);
        extract_file(&root, &path, &text)
    })
    .await
    .map_err(|e| ScanFailure::new(&file, e.to_string()))
}

/// Runs the file's language profile over `text` and resolves its imports to local files.
pub fn extract_file(root: &Path, file: &Path, text: &str) -> FileAnalysis {
    let profile = profile_for_path(file);

    let mut dependencies = BTreeSet::new();
    for import in profile.extract_imports(text) {
        let Some(target) = profile.resolve_import_path(&import, file, root) else {
            continue;
        };
        let target = resolve_against(root, &target);
        if target.is_dir() {
            dependencies.extend(source_files_in(&target));
        } else if target.is_file() && is_supported_path(&target) {
            dependencies.insert(target);
        } else {
            debug!("Import {} in {:?} has no local source", import, file);
        }
    }
    dependencies.remove(file);

    let functions = profile
        .extract_functions(text)
        .into_iter()
        .map(|def| {
            let line = profile.function_line_number(text, &def.name);
            let calls = profile.extract_function_calls(&def.body);
            FunctionInfo::new(file, def, line, calls)
        })
        .collect::<Vec<_>>();

    debug!(
        "Processed {:?} ({}): {} dependencies, {} functions",
        file,
        profile.name(),
        dependencies.len(),
        functions.len()
    );
    FileAnalysis {
        path: file.to_path_buf(),
        dependencies,
        functions,
    }
}

fn source_files_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_path(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn directory_imports_expand_to_package_files() {
        let dir = TempDir::new().unwrap();
        let root = canonical_root(dir.path());
        fs::create_dir_all(root.join("pkgb")).unwrap();
        fs::write(root.join("pkgb/b.go"), "package pkgb\n").unwrap();
        fs::write(root.join("pkgb/c.go"), "package pkgb\n").unwrap();
        fs::write(root.join("pkgb/notes.txt"), "").unwrap();

        let file = root.join("a.go");
        let text = "package main\n\nimport (\n\t\"fmt\"\n\t\"pkgb\"\n)\n\nfunc main() {\n\tfmt.Println(pkgb.B())\n}\n";
        let analysis = extract_file(&root, &file, text);

        let deps: Vec<_> = analysis.dependencies.into_iter().collect();
        assert_eq!(deps, vec![root.join("pkgb/b.go"), root.join("pkgb/c.go")]);
        assert_eq!(analysis.functions.len(), 1);
        assert_eq!(analysis.functions[0].line_number, Some(8));
        assert_eq!(analysis.functions[0].full_name, format!("{}:main", file.display()));
    }

    #[test]
    fn missing_and_self_imports_are_dropped() {
        let dir = TempDir::new().unwrap();
        let root = canonical_root(dir.path());
        let file = root.join("a.py");
        fs::write(&file, "import a\nimport missing\n").unwrap();

        let analysis = extract_file(&root, &file, "import a\nimport missing\n");
        assert!(analysis.dependencies.is_empty());
    }

    fn three_files(root: &Path) -> Vec<PathBuf> {
        fs::write(root.join("a.py"), "import c\n\ndef fa():\n    fc()\n").unwrap();
        fs::write(root.join("c.py"), "def fc():\n    pass\n").unwrap();
        vec![root.join("a.py"), root.join("b.py"), root.join("c.py")]
    }

    #[tokio::test]
    async fn unreadable_file_does_not_stop_its_siblings() {
        let dir = TempDir::new().unwrap();
        let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
        let root = analyzer.root().to_path_buf();
        let files = three_files(&root);

        let (graph, failures, cancelled) = analyzer
            .scan_files(files, &CancellationToken::new())
            .await;

        assert!(!cancelled);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, root.join("b.py"));
        assert_eq!(graph.file_count(), 2);
        assert!(graph.file_dependencies[&root.join("a.py")].contains(&root.join("c.py")));
        assert!(graph.file_functions.contains_key(&root.join("c.py")));
    }

    #[tokio::test]
    async fn failed_scan_keeps_partial_maps_but_stays_uninitialized() {
        let dir = TempDir::new().unwrap();
        let analyzer = DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default());
        let root = analyzer.root().to_path_buf();
        let files = three_files(&root);
        let walk_failure = ScanFailure::new(root.join("z_locked"), "permission denied");

        let err = analyzer
            .build_from(files, vec![walk_failure], &CancellationToken::new(), Instant::now())
            .await
            .unwrap_err();

        match err {
            CodeMapError::Scan(failures) => {
                let paths: Vec<_> = failures.iter().map(|f| f.path.clone()).collect();
                assert_eq!(paths, vec![root.join("b.py"), root.join("z_locked")]);
            }
            other => panic!("expected scan failure, got {other:?}"),
        }
        assert!(!analyzer.is_initialized());
        assert_eq!(analyzer.file_count(), 2);
        assert_eq!(analyzer.functions_in_file("c.py").len(), 1);
    }
}
