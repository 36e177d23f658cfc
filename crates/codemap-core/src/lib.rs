pub mod config;
pub mod error;
pub mod language;
pub mod logging;
pub mod paths;
pub mod types;

pub use config::{
    AnalyzerConfig, CallResolution, CodeMapConfig, IndexerConfig, LoggingConfig,
};
pub use error::*;
pub use language::*;
pub use logging::init_tracing;
pub use paths::*;
pub use types::*;
