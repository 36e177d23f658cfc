pub mod analyzer;
pub mod snapshot;
pub mod state;
pub mod tree;

pub use analyzer::{extract_file, DependencyAnalyzer};
pub use snapshot::SNAPSHOT_VERSION;
pub use state::{FileAnalysis, GraphState};
pub use tree::{file_tree, function_tree, TreeLimits};
