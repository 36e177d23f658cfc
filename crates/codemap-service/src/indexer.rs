use codemap_core::{resolve_against, CodeMapError, FileInfo, Result};
use codemap_graph::DependencyAnalyzer;
use codemap_vector::{Embedder, EmbeddingStore, MetadataFilter, TokenSplitter};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::results::SearchResult;

/// Chunks source files, embeds the chunks and stores them with dependency context.
pub struct CodeIndexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn EmbeddingStore>,
    analyzer: Arc<DependencyAnalyzer>,
    splitter: TokenSplitter,
    embed_batch_size: usize,
    inited: AtomicBool,
}

impl CodeIndexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn EmbeddingStore>,
        analyzer: Arc<DependencyAnalyzer>,
        splitter: TokenSplitter,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            analyzer,
            splitter,
            embed_batch_size: embed_batch_size.max(1),
            inited: AtomicBool::new(false),
        }
    }

    /// True once previously indexed state has been loaded; indexing is then skipped.
    pub fn is_inited(&self) -> bool {
        self.inited.load(Ordering::Acquire)
    }

    pub fn load_from_file(&self, path: &Path) -> Result<()> {
        self.analyzer.load_from_file(path)?;
        self.inited.store(true, Ordering::Release);
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.analyzer.save_to_file(path)
    }

    /// Indexes one file under `collection_id`. Does nothing when prior state was loaded.
    pub async fn index_code_file(&self, path: impl AsRef<Path>, collection_id: &str) -> Result<()> {
        if self.is_inited() {
            return Ok(());
        }

        let path = resolve_against(self.analyzer.root(), path.as_ref());
        if !path.is_file() {
            return Err(CodeMapError::NotFound(format!("file {}", path.display())));
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CodeMapError::file_io(&path, e))?;
        let content = String::from_utf8_lossy(&bytes);

        let info = FileInfo::from_path(&path);
        let language = info.language.tag();
        let tree = self.analyzer.analyze_file_dependency_tree(&path).await?;
        let dependencies = serde_json::to_string(&tree)?;

        let file_path = path.display().to_string();
        let metadata: HashMap<String, String> = [
            ("collection_id", collection_id.to_string()),
            ("file_name", info.file_name()),
            ("file_path", file_path.clone()),
            ("code_language", language.to_string()),
            ("language", language.to_string()),
            ("dependencies", dependencies),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let chunks = self.splitter.split(&content);
        let vectors = self
            .embedder
            .embed_batch(&chunks, self.embed_batch_size)
            .await
            .map_err(|e| CodeMapError::Embedding(format!("{}: {}", file_path, e)))?;
        if vectors.len() != chunks.len() {
            return Err(CodeMapError::Embedding(format!(
                "{}: expected {} vectors, got {}",
                file_path,
                chunks.len(),
                vectors.len()
            )));
        }

        let document_id = format!("{}:{}", collection_id, file_path);
        for (idx, (chunk, vector)) in chunks.iter().zip(vectors).enumerate() {
            self.store.store(
                &format!("{}_{}", document_id, idx),
                vector,
                chunk,
                metadata.clone(),
            )?;
        }
        debug!("Indexed {} ({}): {} chunk(s)", file_path, language, chunks.len());
        Ok(())
    }

    /// Embeds `query` and returns the closest chunks of `collection_id`.
    pub async fn search_code(
        &self,
        query: &str,
        collection_id: &str,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<SearchResult>> {
        let vectors = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(|e| CodeMapError::Embedding(format!("query {:?}: {}", query, e)))?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| CodeMapError::Embedding(format!("no vector for query {:?}", query)))?;

        let mut filter = MetadataFilter::new();
        filter.insert("collection_id".to_string(), collection_id.to_string());
        let records = self
            .store
            .search(&query_vector, Some(&filter), limit, min_relevance)?;
        info!(
            "Search in {} returned {} result(s)",
            collection_id,
            records.len()
        );
        Ok(records.into_iter().map(SearchResult::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_core::AnalyzerConfig;
    use codemap_vector::{HashingEmbedder, InMemoryEmbeddingStore};
    use tempfile::TempDir;

    #[tokio::test]
    async fn long_files_become_numbered_chunks() {
        let dir = TempDir::new().unwrap();
        let source = (0..20)
            .map(|i| format!("def f{i}():\n    return {i}\n"))
            .collect::<String>();
        std::fs::write(dir.path().join("many.py"), &source).unwrap();

        let analyzer = Arc::new(DependencyAnalyzer::new(dir.path(), AnalyzerConfig::default()));
        let store = Arc::new(InMemoryEmbeddingStore::new());
        let indexer = CodeIndexer::new(
            Arc::new(HashingEmbedder::new(32)),
            store.clone(),
            analyzer.clone(),
            TokenSplitter::new(40, 8).unwrap(),
            4,
        );

        indexer.index_code_file("many.py", "c").await.unwrap();
        let chunk_count = TokenSplitter::new(40, 8).unwrap().split(&source).len();
        assert!(chunk_count > 1);
        assert_eq!(store.len(), chunk_count);

        let path = analyzer.root().join("many.py");
        let last = format!("c:{}_{}", path.display(), chunk_count - 1);
        let record = store.get(&last).unwrap();
        let tree: codemap_core::DependencyTree =
            serde_json::from_str(&record.metadata["dependencies"]).unwrap();
        assert_eq!(tree.functions.len(), 20);
    }
}
