use codemap_core::{canonical_root, CodeMapConfig, CodeMapError, DependencyTree, Result, ScanFailure};
use codemap_graph::DependencyAnalyzer;
use codemap_parser::{collect_source_files, DiscoveryOptions};
use codemap_vector::{Embedder, InMemoryEmbeddingStore, TokenSplitter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::indexer::CodeIndexer;
use crate::results::SearchResult;

pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "go",
    "javascript",
    "typescript",
    "python",
    "java",
    "c",
    "cpp",
    "csharp",
    "ruby",
    "php",
    "swift",
    "kotlin",
    "rust",
    "scala",
];

/// What a [`CodeMapService::index_repository`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    /// False when loaded state made indexing unnecessary. When true, new state was stored
    /// and is worth saving even if some files failed.
    pub performed: bool,
    /// Files or directories that could not be indexed, sorted by path.
    pub failures: Vec<ScanFailure>,
}

impl IndexOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(performed)` for a clean run, otherwise the failures as [`CodeMapError::Scan`].
    pub fn into_result(self) -> Result<bool> {
        if self.failures.is_empty() {
            Ok(self.performed)
        } else {
            Err(CodeMapError::Scan(self.failures))
        }
    }
}

/// Dependency analysis and semantic code search over one repository.
pub struct CodeMapService {
    config: CodeMapConfig,
    analyzer: Arc<DependencyAnalyzer>,
    store: Arc<InMemoryEmbeddingStore>,
    indexer: CodeIndexer,
}

impl CodeMapService {
    pub fn new(
        root: impl AsRef<Path>,
        embedder: Arc<dyn Embedder>,
        config: CodeMapConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CodeMapError::Config(e.to_string()))?;
        let splitter = TokenSplitter::from_config(&config.indexer)?;
        let analyzer = Arc::new(DependencyAnalyzer::new(root, config.analyzer.clone()));
        let store = Arc::new(InMemoryEmbeddingStore::new());
        let indexer = CodeIndexer::new(
            embedder,
            store.clone(),
            analyzer.clone(),
            splitter,
            config.indexer.embed_batch_size,
        );
        Ok(Self {
            config,
            analyzer,
            store,
            indexer,
        })
    }

    pub fn analyzer(&self) -> &DependencyAnalyzer {
        &self.analyzer
    }

    pub fn store(&self) -> &InMemoryEmbeddingStore {
        &self.store
    }

    pub fn config(&self) -> &CodeMapConfig {
        &self.config
    }

    /// True when indexed state was loaded, in which case indexing calls do nothing.
    pub fn is_indexed(&self) -> bool {
        self.indexer.is_inited()
    }

    pub fn supported_languages(&self) -> &'static [&'static str] {
        SUPPORTED_LANGUAGES
    }

    /// Restores analyzer and embedding state. Either path may be `None` to skip that part.
    pub fn load_from_file(&self, code_path: Option<&Path>, vector_path: Option<&Path>) -> Result<()> {
        if let Some(path) = code_path {
            self.indexer.load_from_file(path)?;
        }
        if let Some(path) = vector_path {
            self.store.load_from_file(path)?;
        }
        Ok(())
    }

    pub fn save_to_file(&self, code_path: Option<&Path>, vector_path: Option<&Path>) -> Result<()> {
        if let Some(path) = code_path {
            self.indexer.save_to_file(path)?;
        }
        if let Some(path) = vector_path {
            self.store.save_to_file(path)?;
        }
        Ok(())
    }

    pub async fn index_code_file(&self, path: impl AsRef<Path>, collection_id: &str) -> Result<()> {
        self.indexer.index_code_file(path, collection_id).await
    }

    /// Initializes the analyzer, then indexes every supported file under `root`.
    ///
    /// A relative `root` is taken from the current directory. A file that fails to index
    /// does not stop the walk; it is listed in [`IndexOutcome::failures`]. An `Err` means
    /// nothing was indexed.
    pub async fn index_repository(
        &self,
        root: impl AsRef<Path>,
        collection_id: &str,
    ) -> Result<IndexOutcome> {
        self.analyzer.initialize().await?;
        if self.indexer.is_inited() {
            info!("Repository already indexed, skipping {:?}", root.as_ref());
            return Ok(IndexOutcome::default());
        }

        let start = Instant::now();
        let root = canonical_root(root.as_ref());
        let options = DiscoveryOptions::from(&self.config.analyzer);
        let walk_root = root.clone();
        let discovered = tokio::task::spawn_blocking(move || collect_source_files(&walk_root, &options))
            .await
            .map_err(|e| CodeMapError::InvalidOperation(format!("file discovery panicked: {e}")))??;
        let files = discovered.files;
        info!("Indexing {} file(s) from {:?} into {}", files.len(), root, collection_id);

        let mut failures = discovered.failures;
        let mut indexed = 0usize;
        for file in &files {
            match self.indexer.index_code_file(file, collection_id).await {
                Ok(()) => indexed += 1,
                Err(e) => {
                    warn!("Failed to index {:?}: {}", file, e);
                    failures.push(ScanFailure::new(file, e.to_string()));
                }
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            "Indexed {} of {} file(s) in {:.2}s",
            indexed,
            files.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(IndexOutcome {
            performed: true,
            failures,
        })
    }

    /// Semantic search within `collection_id` using the configured relevance threshold.
    pub async fn search_code(
        &self,
        query: &str,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.indexer
            .search_code(
                query,
                collection_id,
                limit,
                self.config.indexer.min_relevance as f32,
            )
            .await
    }

    pub async fn analyze_file_dependencies(&self, path: impl AsRef<Path>) -> Result<DependencyTree> {
        self.analyzer.analyze_file_dependency_tree(path).await
    }

    pub async fn analyze_function_dependencies(
        &self,
        path: impl AsRef<Path>,
        function_name: &str,
    ) -> Result<DependencyTree> {
        self.analyzer
            .analyze_function_dependency_tree(path, function_name)
            .await
    }
}
