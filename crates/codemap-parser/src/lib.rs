pub mod file_collect;
pub mod languages;
pub mod profile;
pub mod scan;

pub use file_collect::{collect_source_files, DiscoveryOptions, SourceFiles};
pub use languages::*;
pub use profile::{profile_for_extension, profile_for_path, LanguageProfile};
