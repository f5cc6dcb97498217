//! Optional vocabulary-based content filter.
//!
//! Matches are whole-word and case-insensitive; each match is replaced by
//! asterisks of equal length so message length stays stable for clients
//! that pre-allocate display buffers.

use regex::Regex;

pub struct ContentFilter {
    patterns: Vec<Regex>,
}

impl ContentFilter {
    /// Builds a filter from a vocabulary list. Words containing regex
    /// metacharacters are escaped before compilation.
    pub fn new(vocabulary: &[String]) -> Self {
        let patterns = vocabulary
            .iter()
            .filter(|word| !word.trim().is_empty())
            .map(|word| {
                let escaped = regex::escape(word);
                Regex::new(&format!(r"(?i)\b{escaped}\b")).expect("escaped pattern is always valid")
            })
            .collect();
        Self { patterns }
    }

    pub fn apply(&self, content: &str) -> String {
        let mut masked = content.to_string();
        for pattern in &self.patterns {
            masked = pattern
                .replace_all(&masked, |caps: &regex::Captures| "*".repeat(caps[0].len()))
                .into_owned();
        }
        masked
    }
}
