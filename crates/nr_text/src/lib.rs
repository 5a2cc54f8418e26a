//! Article text normalization: markup/boilerplate stripping and keyword
//! extraction for storage and search.

pub mod cleaner;
pub mod keywords;
pub mod rules;

pub use cleaner::{clean_article_text, light_clean, Cleaner, TRUNCATION_MARKER};
pub use keywords::{extract_keywords, is_stop_word, KeywordOptions};
pub use rules::CleanerRules;

pub mod prelude {
    pub use super::{clean_article_text, extract_keywords, Cleaner, CleanerRules, KeywordOptions};
}
