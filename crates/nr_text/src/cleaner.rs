//! Heuristic HTML/Markdown cleaner for article bodies.
//!
//! [`Cleaner::clean`] runs the full pipeline: code/comment removal, consent
//! and navigation line drops, image/link/URL/tag stripping, entity decoding,
//! boilerplate and short-line drops, whitespace normalization and a word
//! budget. The stages run in a fixed order; later stages assume the noise
//! removed by earlier ones is gone. When the result is suspiciously short the
//! raw input is recomputed with [`light_clean`], which only strips markup.

use lazy_static::lazy_static;
use nr_core::{Error, Result};
use regex::Regex;
use tracing::debug;

use crate::rules::CleanerRules;

pub const TRUNCATION_MARKER: &str = "[...truncated]";

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?i)<script[\s\S]*?</script>").unwrap();
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?i)<style[\s\S]*?</style>").unwrap();
    static ref HTML_COMMENT: Regex = Regex::new(r"<!--[\s\S]*?-->").unwrap();
    static ref LINK_MARKER: Regex = Regex::new(r"(?i)href=|<a\s+").unwrap();
    static ref MARKDOWN_IMAGE: Regex = Regex::new(r"!\[.*?\]\(.*?\)").unwrap();
    static ref IMG_TAG: Regex = Regex::new(r"(?i)<img[\s\S]*?>").unwrap();
    static ref MARKDOWN_LINK: Regex =
        Regex::new(r"(?i)\[([^\]]+)\]\((?:https?://[^\s)]+|mailto:[^\s)]+)\)").unwrap();
    static ref MAILTO: Regex = Regex::new(r"(?i)mailto:[^\s)]+").unwrap();
    static ref BARE_URL: Regex = Regex::new(r"(?i)https?://[^\s)]+").unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"</?[^>]+(>|$)").unwrap();
    static ref ENTITY: Regex = Regex::new(r"(?i)&(nbsp|amp|quot|apos|ndash|mdash);").unwrap();
    static ref SEPARATOR_RUN: Regex = Regex::new(r"={2,}|-{2,}").unwrap();
    static ref BULLET: Regex = Regex::new(r"[•◦▪→←↑↓★†●]").unwrap();
    static ref LINE_ENDING: Regex = Regex::new(r"\r\n|\r").unwrap();
    static ref NEWLINE_RUN: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref HSPACE_RUN: Regex = Regex::new(r"[ \t]{2,}").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s{3,}").unwrap();
    static ref ANY_WHITESPACE_RUN: Regex = Regex::new(r"\s{2,}").unwrap();
    static ref DEFAULT_CLEANER: Cleaner = Cleaner::default();
}

/// Clean with the default rules.
pub fn clean_article_text(raw: &str) -> String {
    DEFAULT_CLEANER.clean(raw)
}

/// Markup-only clean used as the fallback: scripts, styles, images, links,
/// tags and URLs go; phrase and line heuristics are skipped.
pub fn light_clean(raw: &str) -> String {
    let s = strip_code(raw);
    let s = strip_images(&s);
    let s = unwrap_links(&s);
    let s = strip_tags(&s);
    let s = BARE_URL.replace_all(&s, " ");
    ANY_WHITESPACE_RUN.replace_all(&s, " ").trim().to_string()
}

#[derive(Debug, Clone)]
pub struct Cleaner {
    rules: CleanerRules,
    menu_words: Option<Regex>,
    consent_phrases: Vec<String>,
    boilerplate_phrases: Vec<String>,
    ui_fragments: Vec<String>,
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(CleanerRules::default()).expect("default cleaner rules compile")
    }
}

impl Cleaner {
    pub fn new(rules: CleanerRules) -> Result<Self> {
        rules.validate()?;
        let menu_words = if rules.menu_words.is_empty() {
            None
        } else {
            let alternation = rules
                .menu_words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
                .map_err(|e| Error::Config(format!("Invalid menu words: {}", e)))?;
            Some(re)
        };

        Ok(Self {
            consent_phrases: lowercase_all(&rules.consent_phrases),
            boilerplate_phrases: lowercase_all(&rules.boilerplate_phrases),
            ui_fragments: lowercase_all(&rules.ui_fragments),
            menu_words,
            rules,
        })
    }

    pub fn rules(&self) -> &CleanerRules {
        &self.rules
    }

    /// Full pipeline with the short-result fallback. Never fails; empty input
    /// gives empty output.
    pub fn clean(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let cleaned = self.deep_clean(raw);
        if cleaned.chars().count() >= self.rules.fallback_min_chars {
            return cleaned;
        }

        let light = light_clean(raw);
        debug!(
            "Cleaned text too short ({} chars), using light clean ({} chars)",
            cleaned.chars().count(),
            light.chars().count()
        );
        self.truncate_words(light)
    }

    /// The fourteen-stage pipeline without the fallback.
    pub fn deep_clean(&self, raw: &str) -> String {
        let s = strip_code(raw);
        let s = drop_lines_containing(&s, &self.consent_phrases);
        let s = self.drop_menu_lines(&s);
        let s = strip_images(&s);
        let s = unwrap_links(&s);
        let s = strip_urls(&s);
        let s = strip_tags(&s);
        let s = decode_entities(&s);
        let s = drop_lines_containing(&s, &self.boilerplate_phrases);
        let s = self.filter_lines(&s);
        let s = strip_separators(&s);
        let s = normalize_whitespace(&s);
        self.truncate_words(s.trim().to_string())
    }

    /// A line looks like navigation when it carries too many links, pipes or menu words.
    pub fn is_menu_line(&self, line: &str) -> bool {
        let links = LINK_MARKER.find_iter(line).count();
        let pipes = line.matches('|').count();
        let menu_words = self
            .menu_words
            .as_ref()
            .map(|re| re.find_iter(line).count())
            .unwrap_or(0);

        links > self.rules.max_link_markers
            || pipes > self.rules.max_pipes
            || menu_words > self.rules.max_menu_words
    }

    fn drop_menu_lines(&self, s: &str) -> String {
        s.split('\n')
            .filter(|line| !self.is_menu_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn filter_lines(&self, s: &str) -> String {
        s.split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| {
                let lower = line.to_lowercase();
                !self.ui_fragments.iter().any(|f| *f == lower)
            })
            .filter(|line| {
                line.chars().count() >= self.rules.min_line_chars
                    || line.contains(|c: char| matches!(c, '.' | '!' | '?'))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn truncate_words(&self, s: String) -> String {
        let words: Vec<&str> = s.split_whitespace().collect();
        if words.len() <= self.rules.truncate_above_words {
            return s;
        }
        format!(
            "{}\n\n{}",
            words[..self.rules.truncate_to_words].join(" "),
            TRUNCATION_MARKER
        )
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_code(s: &str) -> String {
    let s = SCRIPT_BLOCK.replace_all(s, " ");
    let s = STYLE_BLOCK.replace_all(&s, " ");
    HTML_COMMENT.replace_all(&s, " ").into_owned()
}

/// Drops every line holding one of `phrases`; phrases must already be lowercase.
fn drop_lines_containing(s: &str, phrases: &[String]) -> String {
    s.split('\n')
        .filter(|line| {
            let lower = line.to_lowercase();
            !phrases.iter().any(|p| lower.contains(p.as_str()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_images(s: &str) -> String {
    let s = MARKDOWN_IMAGE.replace_all(s, " ");
    IMG_TAG.replace_all(&s, " ").into_owned()
}

fn unwrap_links(s: &str) -> String {
    MARKDOWN_LINK.replace_all(s, "${1}").into_owned()
}

fn strip_urls(s: &str) -> String {
    let s = MAILTO.replace_all(s, " ");
    BARE_URL.replace_all(&s, " ").into_owned()
}

fn strip_tags(s: &str) -> String {
    ANY_TAG.replace_all(s, " ").into_owned()
}

fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &regex::Captures| {
            match caps[1].to_ascii_lowercase().as_str() {
                "nbsp" => " ",
                "amp" => "&",
                "quot" => "\"",
                "apos" => "'",
                _ => "-",
            }
            .to_string()
        })
        .into_owned()
}

fn strip_separators(s: &str) -> String {
    let s = SEPARATOR_RUN.replace_all(s, " ");
    BULLET.replace_all(&s, " ").into_owned()
}

fn normalize_whitespace(s: &str) -> String {
    let s = LINE_ENDING.replace_all(s, "\n");
    let s = NEWLINE_RUN.replace_all(&s, "\n\n");
    let s = HSPACE_RUN.replace_all(&s, " ");
    WHITESPACE_RUN.replace_all(&s, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "The central bank held interest rates steady on Tuesday, citing easing inflation.\n\
Analysts had expected the decision after weeks of mixed economic data.\n\
Markets rose modestly in afternoon trading as investors digested the statement.";

    #[test]
    fn test_script_scenario() {
        let cleaned = clean_article_text("<script>bad()</script>Hello world. This is great news today.");
        assert!(cleaned.contains("Hello world. This is great news today."));
        assert!(!cleaned.contains("bad()"));
    }

    #[test]
    fn test_script_and_style_never_survive() {
        let raw = format!(
            "<style>.ad {{ color: red }}</style>\n{}\n<SCRIPT type=\"text/javascript\">track('visit');</SCRIPT>\n<!-- tracking pixel -->",
            ARTICLE
        );
        let cleaned = clean_article_text(&raw);
        assert!(!cleaned.contains("color: red"));
        assert!(!cleaned.contains("track("));
        assert!(!cleaned.contains("tracking pixel"));
        assert!(cleaned.starts_with("The central bank held interest rates steady"));
    }

    #[test]
    fn test_menu_line_detection() {
        let cleaner = Cleaner::default();
        assert!(cleaner.is_menu_line("Home | News | Subscribe | Sign in | Contact"));
        assert!(!cleaner.is_menu_line("Home News About"));
        assert!(!cleaner.is_menu_line("a | b | c | d | e"));
        assert!(cleaner.is_menu_line("a | b | c | d | e | f"));
        assert!(!cleaner.is_menu_line(r#"<link href="1"> <link href="2"> <link href="3">"#));
        assert!(cleaner.is_menu_line(r#"<link href="1"> <link href="2"> <link href="3"> <link href="4">"#));
        // an anchor counts both its tag and its href
        assert!(!cleaner.is_menu_line(r#"<a href="1">One</a>"#));
        assert!(cleaner.is_menu_line(r#"<a href="1">One</a> <a href="2">Two</a>"#));
    }

    #[test]
    fn test_menu_line_removed_from_article() {
        let raw = format!("Home | News | Topics | Sign in | Contact\n{}", ARTICLE);
        let cleaned = clean_article_text(&raw);
        assert!(!cleaned.contains("Sign in"));
        assert!(cleaned.contains("The central bank held interest rates steady"));
    }

    #[test]
    fn test_consent_phrases_drop_whole_line() {
        let cleaner = Cleaner::default();
        for phrase in &cleaner.rules().consent_phrases {
            let line = format!("Before you continue, {} applies to this site in full.", phrase.to_uppercase());
            let raw = format!("{}\n{}", line, ARTICLE);
            let cleaned = cleaner.deep_clean(&raw);
            assert!(!cleaned.contains("Before you continue"), "phrase {:?} kept its line", phrase);
            assert!(cleaned.contains("Markets rose modestly"));
        }
    }

    #[test]
    fn test_boilerplate_phrases_drop_whole_line() {
        let cleaner = Cleaner::default();
        for phrase in &cleaner.rules().boilerplate_phrases {
            let line = format!("Footer text mentioning {} at the bottom of the page.", phrase);
            let raw = format!("{}\n{}", ARTICLE, line);
            let cleaned = cleaner.deep_clean(&raw);
            assert!(!cleaned.contains("Footer text"), "phrase {:?} kept its line", phrase);
        }
    }

    #[test]
    fn test_links_images_and_urls() {
        let s = "[Reuters](https://reuters.com/a) reported ![chart](chart.png) a rise <img src=\"x.png\"> mailto:desk@paper.com and https://example.com/x today.";
        let s = strip_images(s);
        let s = unwrap_links(&s);
        let s = strip_urls(&s);
        let s = normalize_whitespace(&s);
        assert_eq!(s.split_whitespace().collect::<Vec<_>>().join(" "), "Reuters reported a rise and today.");
    }

    #[test]
    fn test_strip_tags_and_unterminated_tag() {
        assert_eq!(strip_tags("<p>Hi</p>").trim(), "Hi");
        assert_eq!(strip_tags("text <div class=\"x\"").trim(), "text");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_entities("Tom &amp; Jerry&nbsp;said &quot;hi&quot; &mdash; it&apos;s &NDASH; fine"),
            "Tom & Jerry said \"hi\" - it's - fine"
        );
    }

    #[test]
    fn test_short_lines_and_ui_fragments() {
        let cleaner = Cleaner::default();
        let s = "Share\nRead next\n  Stocks fell.  \nno punctuation here\nThis line is comfortably long enough\nLoad More";
        assert_eq!(
            cleaner.filter_lines(s),
            "Stocks fell.\nThis line is comfortably long enough"
        );
    }

    #[test]
    fn test_separators_and_bullets() {
        assert_eq!(strip_separators("a==b--c-d • e"), "a b c-d   e");
    }

    #[test]
    fn test_whitespace_normalization() {
        assert_eq!(normalize_whitespace("a\r\n\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("a \n \n b"), "a b");
        assert_eq!(normalize_whitespace("a\n\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("a  \t b"), "a b");
    }

    #[test]
    fn test_truncation() {
        let long = vec!["alpha"; 4001].join(" ") + ".";
        let cleaned = clean_article_text(&long);
        assert!(cleaned.ends_with(TRUNCATION_MARKER));
        let body = cleaned.trim_end_matches(TRUNCATION_MARKER);
        assert_eq!(body.split_whitespace().count(), 2000);

        let exact = vec!["alpha"; 4000].join(" ") + ".";
        let cleaned = clean_article_text(&exact);
        assert!(!cleaned.contains(TRUNCATION_MARKER));
        assert_eq!(cleaned.split_whitespace().count(), 4000);
    }

    #[test]
    fn test_idempotent_on_clean_text() {
        let once = clean_article_text(ARTICLE);
        assert_eq!(once, ARTICLE);
        assert_eq!(clean_article_text(&once), once);
    }

    #[test]
    fn test_fallback_uses_light_clean() {
        let raw = "<p>We use cookies to report this long enough sentence about the harbour fire downtown.</p>";
        let cleaner = Cleaner::default();
        assert!(cleaner.deep_clean(raw).is_empty());
        let cleaned = cleaner.clean(raw);
        assert_eq!(cleaned, light_clean(raw));
        assert!(cleaned.starts_with("We use cookies"));
    }

    #[test]
    fn test_light_clean() {
        let raw = "<style>p{}</style><h1>Title</h1>\n\n[Link text](https://a.b/c) and ![i](x.png) https://x.y/z end";
        assert_eq!(light_clean(raw), "Title Link text and end");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_article_text(""), "");
        assert_eq!(clean_article_text("   \n\t"), "");
    }

    #[test]
    fn test_custom_rules() {
        let rules = CleanerRules {
            menu_words: vec!["Login".to_string()],
            max_menu_words: 1,
            ..Default::default()
        };
        let cleaner = Cleaner::new(rules).unwrap();
        assert!(cleaner.is_menu_line("Login or Login again"));
        assert!(!cleaner.is_menu_line("Home | News | Topics | Search | About"));
    }
}
