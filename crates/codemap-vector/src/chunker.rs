use codemap_core::{CodeMapError, IndexerConfig, Result};
use once_cell::sync::Lazy;
use regex::Regex;

// Identifier runs, digit runs, whitespace runs, then any single character. Every character
// belongs to exactly one token, so joining the tokens reproduces the input.
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)[\p{L}_][\p{L}\p{N}_]*|\p{N}+|\s+|.").expect("built-in pattern"));

/// Splits text into overlapping windows measured in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TokenSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CodeMapError::Config("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(CodeMapError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn count_tokens(text: &str) -> usize {
        TOKEN.find_iter(text).count()
    }

    /// Windows of at most `chunk_size` tokens, each starting `chunk_size - chunk_overlap`
    /// tokens after the previous one. Whitespace-only input yields nothing.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let tokens: Vec<&str> = TOKEN.find_iter(text).map(|m| m.as_str()).collect();
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(tokens.len());
            chunks.push(tokens[start..end].concat());
            if end == tokens.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}
