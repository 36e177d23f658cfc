use codemap_core::DependencyTree;
use codemap_vector::EmbeddingRecord;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A code chunk matched by a semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub code: String,
    pub description: String,
    pub relevance: f32,
    /// Dependency tree of the chunk's file, when it was stored and could be decoded.
    pub references: Option<DependencyTree>,
}

impl From<EmbeddingRecord> for SearchResult {
    fn from(record: EmbeddingRecord) -> Self {
        let references = record.metadata.get("dependencies").and_then(|json| {
            serde_json::from_str(json)
                .map_err(|e| warn!("Undecodable dependency tree on {}: {}", record.id, e))
                .ok()
        });
        let description = describe(&record);
        Self {
            id: record.id,
            code: record.content,
            description,
            relevance: record.score,
            references,
        }
    }
}

fn describe(record: &EmbeddingRecord) -> String {
    let file_name = record.metadata.get("file_name").map_or("", String::as_str);
    let language = record
        .metadata
        .get("code_language")
        .map_or("", String::as_str);
    format!("Code from {} (language: {})", file_name, language)
}
