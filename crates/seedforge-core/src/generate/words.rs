use fake::faker::lorem::en::Word;
use fake::Fake;
use rand::Rng;
use std::path::Path;

use crate::error::{Result, SeedForgeError};

/// Candidate strings for text columns. An empty source falls back to the
/// built-in lorem generator.
#[derive(Debug, Clone, Default)]
pub struct WordSource {
    words: Vec<String>,
}

impl WordSource {
    pub fn new(words: Vec<String>) -> Self {
        let words = words
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Load a newline-separated dictionary. Blank lines and `#` comments are
    /// skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SeedForgeError::Config {
            message: format!("cannot read dictionary {}: {}", path.display(), e),
        })?;
        let words = content
            .lines()
            .filter(|l| !l.trim_start().starts_with('#'))
            .map(str::to_string)
            .collect();
        let source = Self::new(words);
        if source.is_empty() {
            tracing::warn!(path = %path.display(), "Dictionary has no words, using generated text");
        } else {
            tracing::debug!(path = %path.display(), words = source.len(), "Loaded dictionary");
        }
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn pick(&self, rng: &mut impl Rng) -> String {
        if self.words.is_empty() {
            Word().fake_with_rng(rng)
        } else {
            self.words[rng.random_range(0..self.words.len())].clone()
        }
    }

    /// `count` words joined by single spaces.
    pub fn phrase(&self, rng: &mut impl Rng, count: usize) -> String {
        (0..count.max(1))
            .map(|_| self.pick(rng))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
