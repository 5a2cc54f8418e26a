use nr_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONSENT_PHRASES: &[&str] = &[
    "manage your consent",
    "manage your consent preferences",
    "privacy policy",
    "accept all",
    "reject all",
    "confirm my choices",
    "cookies",
    "opt-out",
    "targeted advertising",
    "powered by",
    "your california privacy rights",
    "cookie settings",
];

const MENU_WORDS: &[&str] = &[
    "Home", "News", "Subscribe", "Search", "Sign in", "Contact", "About", "More", "Topics",
];

const BOILERPLATE_PHRASES: &[&str] = &[
    "©",
    "all rights reserved",
    "read more",
    "read our affiliate link policy",
    "follow us",
    "subscribe",
    "view more",
    "related",
    "most read",
    "advertisement",
    "advertisements",
    "adchoices",
    "cookie policy",
    "privacy choices",
    "user agreement",
];

const UI_FRAGMENTS: &[&str] = &[
    "share", "follow", "comments", "comment", "related", "read next", "prev", "next", "load more",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Heuristic data driving the cleaner. Every list and threshold can be
/// overridden from JSON; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerRules {
    /// A line containing any of these (case-insensitive) is dropped before tag stripping.
    pub consent_phrases: Vec<String>,
    /// Whole words counted when deciding whether a line is a navigation menu.
    pub menu_words: Vec<String>,
    /// A line containing any of these (case-insensitive) is dropped after tag stripping.
    pub boilerplate_phrases: Vec<String>,
    /// Lines equal to one of these (case-insensitive) are dropped.
    pub ui_fragments: Vec<String>,
    pub max_link_markers: usize,
    pub max_pipes: usize,
    pub max_menu_words: usize,
    /// Shorter lines survive only with sentence punctuation.
    pub min_line_chars: usize,
    pub truncate_above_words: usize,
    pub truncate_to_words: usize,
    /// Results shorter than this are recomputed with the light clean.
    pub fallback_min_chars: usize,
}

impl Default for CleanerRules {
    fn default() -> Self {
        Self {
            consent_phrases: owned(CONSENT_PHRASES),
            menu_words: owned(MENU_WORDS),
            boilerplate_phrases: owned(BOILERPLATE_PHRASES),
            ui_fragments: owned(UI_FRAGMENTS),
            max_link_markers: 3,
            max_pipes: 4,
            max_menu_words: 3,
            min_line_chars: 20,
            truncate_above_words: 4000,
            truncate_to_words: 2000,
            fallback_min_chars: 100,
        }
    }
}

impl CleanerRules {
    pub fn from_json(json: &str) -> Result<Self> {
        let rules: CleanerRules = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.truncate_to_words == 0 || self.truncate_to_words > self.truncate_above_words {
            return Err(Error::Config(format!(
                "truncate_to_words ({}) must be between 1 and truncate_above_words ({})",
                self.truncate_to_words, self.truncate_above_words
            )));
        }
        Ok(())
    }
}
