pub mod chunker;
pub mod hashing;
pub mod providers;
pub mod similarity;
pub mod store;

pub use chunker::TokenSplitter;
pub use hashing::HashingEmbedder;
pub use providers::Embedder;
pub use similarity::cosine_similarity;
pub use store::{EmbeddingRecord, EmbeddingStore, InMemoryEmbeddingStore, MetadataFilter};
