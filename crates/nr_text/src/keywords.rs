use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "about",
        "which", "there", "their", "these", "would", "could", "should", "however", "between",
        "through", "during", "before", "after", "within", "while", "where", "when", "what",
        "whats", "your", "youre", "youve", "they", "theyre", "have", "had", "this", "also",
        "more", "than", "like", "just", "been",
    ]
    .into_iter()
    .collect();
}

/// Token filters for keyword extraction.
///
/// Stored documents favour longer, distinctive words; queries keep short
/// meaningful tokens such as "ai" or "uk".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordOptions {
    /// Tokens with fewer characters are discarded
    pub min_len: usize,
    pub max_keywords: usize,
}

impl KeywordOptions {
    pub const fn document() -> Self {
        Self { min_len: 5, max_keywords: 30 }
    }

    pub const fn query() -> Self {
        Self { min_len: 2, max_keywords: 10 }
    }
}

impl Default for KeywordOptions {
    fn default() -> Self {
        Self::document()
    }
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Unique lowercase alphanumeric tokens ranked by frequency, ties in order of
/// first occurrence, at most `options.max_keywords` of them.
pub fn extract_keywords(text: &str, options: KeywordOptions) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for token in normalized.split_whitespace() {
        if token.len() < options.min_len || is_stop_word(token) {
            continue;
        }
        match positions.get(token) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // stable: equal counts keep first-occurrence order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(options.max_keywords)
        .map(|(token, _)| token.to_string())
        .collect()
}
