use codemap_core::{CodeMapError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::similarity::cosine_similarity;

/// Exact-match conditions on record metadata, all of which must hold.
pub type MetadataFilter = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub vector: Vec<f32>,
    /// Similarity to the query; only set on search results.
    #[serde(default)]
    pub score: f32,
}

impl EmbeddingRecord {
    fn matches(&self, filter: Option<&MetadataFilter>) -> bool {
        filter.map_or(true, |filter| {
            filter
                .iter()
                .all(|(key, value)| self.metadata.get(key) == Some(value))
        })
    }
}

/// Id-keyed storage of embedded content with similarity search.
pub trait EmbeddingStore: Send + Sync {
    /// Inserts or replaces the record with this id.
    fn store(
        &self,
        id: &str,
        vector: Vec<f32>,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// Records matching `filter` with cosine similarity of at least `min_relevance`,
    /// best first with ties ordered by id. A `limit` of 0 returns every match.
    fn search(
        &self,
        query: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<EmbeddingRecord>>;

    fn get(&self, id: &str) -> Result<EmbeddingRecord>;

    fn delete(&self, id: &str) -> Result<()>;

    fn list(&self) -> Result<Vec<EmbeddingRecord>>;
}

const STORE_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoreSnapshotRef<'a> {
    version: u32,
    records: Vec<&'a EmbeddingRecord>,
}

#[derive(Deserialize)]
struct StoreSnapshot {
    version: u32,
    records: Vec<EmbeddingRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryEmbeddingStore {
    records: RwLock<HashMap<String, EmbeddingRecord>>,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = {
            let records = self.records.read();
            let mut sorted: Vec<&EmbeddingRecord> = records.values().collect();
            sorted.sort_by(|a, b| a.id.cmp(&b.id));
            bincode::serde::encode_to_vec(
                StoreSnapshotRef {
                    version: STORE_VERSION,
                    records: sorted,
                },
                bincode::config::standard(),
            )
            .map_err(|e: bincode::error::EncodeError| CodeMapError::Persistence(e.to_string()))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CodeMapError::file_io(parent, e))?;
        }
        fs::write(path, &bytes).map_err(|e| CodeMapError::file_io(path, e))?;
        info!(
            "Saved embedding store: {} records, {} bytes to {:?}",
            self.len(),
            bytes.len(),
            path
        );
        Ok(())
    }

    /// Replaces the current contents with the records saved at `path`.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| CodeMapError::file_io(path, e))?;
        let (snapshot, _): (StoreSnapshot, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |e: bincode::error::DecodeError| CodeMapError::Persistence(e.to_string()),
            )?;
        if snapshot.version != STORE_VERSION {
            return Err(CodeMapError::Persistence(format!(
                "unsupported embedding store version {} (expected {})",
                snapshot.version, STORE_VERSION
            )));
        }

        let count = snapshot.records.len();
        *self.records.write() = snapshot
            .records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        info!("Loaded embedding store: {} records from {:?}", count, path);
        Ok(())
    }
}

impl EmbeddingStore for InMemoryEmbeddingStore {
    fn store(
        &self,
        id: &str,
        vector: Vec<f32>,
        content: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let record = EmbeddingRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata,
            vector,
            score: 0.0,
        };
        if self.records.write().insert(id.to_string(), record).is_some() {
            debug!("Replaced embedding {}", id);
        }
        Ok(())
    }

    fn search(
        &self,
        query: &[f32],
        filter: Option<&MetadataFilter>,
        limit: usize,
        min_relevance: f32,
    ) -> Result<Vec<EmbeddingRecord>> {
        let mut results: Vec<EmbeddingRecord> = {
            let records = self.records.read();
            records
                .values()
                .filter(|record| record.matches(filter))
                .filter_map(|record| {
                    let score = cosine_similarity(query, &record.vector);
                    (score >= min_relevance).then(|| EmbeddingRecord {
                        score,
                        ..record.clone()
                    })
                })
                .collect()
        };

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        if limit > 0 {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn get(&self, id: &str) -> Result<EmbeddingRecord> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CodeMapError::NotFound(format!("embedding {id}")))
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.records
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CodeMapError::NotFound(format!("embedding {id}")))
    }

    fn list(&self) -> Result<Vec<EmbeddingRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }
}
