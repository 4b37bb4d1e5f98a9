//! Sparse lexical postings.
//!
//! Term-frequency postings with length normalization, rebuilt in-process at
//! index time; cheap enough that caching them would cost more than it saves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Length-normalized term frequencies for one chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Posting {
    terms: HashMap<String, f32>,
}

impl Posting {
    /// Build a posting over the chunk text.
    pub fn build(text: &str) -> Self {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Self::default();
        }

        let norm = 1.0 / tokens.len() as f32;
        let mut terms: HashMap<String, f32> = HashMap::new();
        for token in tokens {
            *terms.entry(token).or_insert(0.0) += norm;
        }

        Self { terms }
    }

    /// Relevance of this posting for a tokenized query: the summed
    /// normalized frequency of every query term present in the chunk.
    pub fn score(&self, query_terms: &[String]) -> f32 {
        query_terms
            .iter()
            .map(|t| self.terms.get(t).copied().unwrap_or(0.0))
            .sum()
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the posting holds no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Lowercase alphanumeric tokens, split on everything else.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
