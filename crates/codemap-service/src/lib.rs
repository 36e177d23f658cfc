pub mod indexer;
pub mod results;
pub mod service;

pub use indexer::CodeIndexer;
pub use results::SearchResult;
pub use service::{CodeMapService, IndexOutcome, SUPPORTED_LANGUAGES};
