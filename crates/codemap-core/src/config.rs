use std::path::Path;

use anyhow::{Context, Result};
use config as cfg;
use serde::{Deserialize, Serialize};

/// How a call name is mapped to a function when the current file does not define it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallResolution {
    /// Take the first definition found while scanning files in path order.
    #[default]
    FirstMatch,
    /// Resolve only when exactly one other file defines the name.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub max_file_depth: usize,
    pub max_function_depth: usize,
    /// Upper bound on files processed at the same time during initialization.
    pub max_concurrent_files: usize,
    pub call_resolution: CallResolution,
    /// Directory names skipped during discovery, in addition to hidden entries.
    pub skip_dirs: Vec<String>,
    pub respect_gitignore: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_file_depth: 10,
            max_function_depth: 20,
            max_concurrent_files: num_cpus::get().max(1) * 4,
            call_resolution: CallResolution::FirstMatch,
            skip_dirs: vec!["vendor".to_string(), "node_modules".to_string()],
            respect_gitignore: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens shared between consecutive chunks.
    pub chunk_overlap: usize,
    pub min_relevance: f64,
    pub embed_batch_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            chunk_overlap: 128,
            min_relevance: 0.3,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CodeMapConfig {
    pub analyzer: AnalyzerConfig,
    pub indexer: IndexerConfig,
    pub logging: LoggingConfig,
}

impl CodeMapConfig {
    pub const ENV_PREFIX: &'static str = "CODEMAP";

    /// Loads `codemap.{toml,yaml,yml,json}` from `config_dir` (all optional), then
    /// `CODEMAP__*` environment variables on top.
    pub fn load_from_dir(config_dir: &Path) -> Result<Self> {
        Self::load_with_env_prefix(config_dir, Self::ENV_PREFIX)
    }

    pub fn load_with_env_prefix(config_dir: &Path, env_prefix: &str) -> Result<Self> {
        let settings: CodeMapConfig = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("codemap.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("codemap.yaml")).required(false))
            .add_source(cfg::File::from(config_dir.join("codemap.yml")).required(false))
            .add_source(cfg::File::from(config_dir.join("codemap.json")).required(false))
            .add_source(
                cfg::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.analyzer.max_file_depth > 0,
            "analyzer.max_file_depth must be > 0"
        );
        anyhow::ensure!(
            self.analyzer.max_function_depth > 0,
            "analyzer.max_function_depth must be > 0"
        );
        anyhow::ensure!(
            self.analyzer.max_concurrent_files > 0,
            "analyzer.max_concurrent_files must be > 0"
        );
        anyhow::ensure!(self.indexer.chunk_size > 0, "indexer.chunk_size must be > 0");
        anyhow::ensure!(
            self.indexer.chunk_overlap < self.indexer.chunk_size,
            "indexer.chunk_overlap must be smaller than indexer.chunk_size"
        );
        anyhow::ensure!(
            (-1.0..=1.0).contains(&self.indexer.min_relevance),
            "indexer.min_relevance must be within [-1, 1]"
        );
        anyhow::ensure!(
            self.indexer.embed_batch_size > 0,
            "indexer.embed_batch_size must be > 0"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = CodeMapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analyzer.max_file_depth, 10);
        assert_eq!(config.analyzer.max_function_depth, 20);
        assert_eq!(config.indexer.chunk_size, 4096);
        assert_eq!(config.indexer.chunk_overlap, 128);
        assert_eq!(config.analyzer.call_resolution, CallResolution::FirstMatch);
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("codemap.toml"),
            "[analyzer]\nmax_file_depth = 3\ncall_resolution = \"strict\"\n\n[indexer]\nmin_relevance = 0.5\n",
        )
        .unwrap();

        let config = CodeMapConfig::load_with_env_prefix(dir.path(), "CODEMAP_TEST_TOML").unwrap();
        assert_eq!(config.analyzer.max_file_depth, 3);
        assert_eq!(config.analyzer.call_resolution, CallResolution::Strict);
        assert_eq!(config.analyzer.max_function_depth, 20);
        assert!((config.indexer.min_relevance - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("codemap.toml"), "[analyzer]\nmax_file_depth = 3\n").unwrap();
        std::env::set_var("CODEMAP_TEST_ENV__ANALYZER__MAX_FILE_DEPTH", "7");

        let config = CodeMapConfig::load_with_env_prefix(dir.path(), "CODEMAP_TEST_ENV").unwrap();
        assert_eq!(config.analyzer.max_file_depth, 7);

        std::env::remove_var("CODEMAP_TEST_ENV__ANALYZER__MAX_FILE_DEPTH");
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = CodeMapConfig::default();
        config.indexer.chunk_overlap = config.indexer.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("codemap.toml"), "[analyzer]\nmax_file_depth = 0\n").unwrap();
        assert!(CodeMapConfig::load_with_env_prefix(dir.path(), "CODEMAP_TEST_BAD").is_err());
    }
}
