use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an article's derived fields (`content`, `keywords`) are up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(crate::Error::Storage(format!("Unknown processing status: {}", other))),
        }
    }
}

/// An article document as held by the document store. Field names on the
/// wire follow the store's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "urlToImage", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "publishedAt", default = "Utc::now")]
    pub published_at: DateTime<Utc>,
    /// Raw body as ingested; may contain HTML or Markdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_clean_content: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// A freshly ingested article: raw content set, nothing derived yet.
    pub fn new(id: impl Into<String>, category: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            url: None,
            image_url: None,
            source: None,
            author: None,
            summary: None,
            category: category.into().to_lowercase(),
            published_at: Utc::now(),
            full_clean_content: Some(raw.into()),
            content: String::new(),
            keywords: Vec::new(),
            processing_status: ProcessingStatus::Pending,
            updated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Title and cleaned body, as used by the substring search fallback.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.title.as_deref().unwrap_or_default(), self.content)
    }

    pub fn apply(&mut self, update: &ContentUpdate) {
        self.content = update.content.clone();
        self.keywords = update.keywords.clone();
        self.processing_status = update.processing_status;
        self.updated_at = Some(update.updated_at);
    }
}

/// Article as returned to callers: the raw body and keyword set stay server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleView {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "urlToImage", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub category: String,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub content: String,
    pub processing_status: ProcessingStatus,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Article> for ArticleView {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            description: article.description,
            url: article.url,
            image_url: article.image_url,
            source: article.source,
            author: article.author,
            summary: article.summary,
            category: article.category,
            published_at: article.published_at,
            content: article.content,
            processing_status: article.processing_status,
            updated_at: article.updated_at,
        }
    }
}

/// Derived fields written back after the content pipeline ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub content: String,
    pub keywords: Vec<String>,
    pub processing_status: ProcessingStatus,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Keyword-intersection lookup: any stored keyword in `keywords` matches.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordQuery {
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub status: ProcessingStatus,
    pub limit: usize,
}

/// Newest-first window over the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentQuery {
    pub category: Option<String>,
    pub status: Option<ProcessingStatus>,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferences: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bookmarked_articles: Vec<String>,
}

/// Fields a caller may merge into their profile. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferences: Option<Vec<String>>,
}

impl UserProfile {
    pub fn merge(&mut self, patch: &ProfilePatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(username) = &patch.username {
            self.username = Some(username.clone());
        }
        if let Some(country) = &patch.country {
            self.country = Some(country.clone());
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(preferences) = &patch.preferences {
            self.preferences = preferences.clone();
        }
    }

    /// Set-union of one id; returns false when it was already present.
    pub fn add_bookmark(&mut self, article_id: &str) -> bool {
        if self.bookmarked_articles.iter().any(|id| id == article_id) {
            return false;
        }
        self.bookmarked_articles.push(article_id.to_string());
        true
    }

    /// Removes every occurrence of the id.
    pub fn remove_bookmark(&mut self, article_id: &str) -> bool {
        let before = self.bookmarked_articles.len();
        self.bookmarked_articles.retain(|id| id != article_id);
        before != self.bookmarked_articles.len()
    }
}

/// Authenticated identity of whoever invoked a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub uid: String,
}

impl Caller {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechAudio {
    pub audio_base64: String,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_wire_names() {
        let json = serde_json::json!({
            "id": "a1",
            "title": "Rates",
            "category": "business",
            "publishedAt": "2024-05-01T10:00:00Z",
            "full_clean_content": "<p>raw</p>",
            "processing_status": "completed",
            "keywords": ["rates"]
        });
        let article: Article = serde_json::from_value(json).unwrap();
        assert_eq!(article.full_clean_content.as_deref(), Some("<p>raw</p>"));
        assert_eq!(article.processing_status, ProcessingStatus::Completed);

        let view = serde_json::to_value(ArticleView::from(article)).unwrap();
        assert!(view.get("full_clean_content").is_none());
        assert!(view.get("keywords").is_none());
        assert_eq!(view["publishedAt"], "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_empty_profile_serializes_to_empty_object() {
        let value = serde_json::to_value(UserProfile::default()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_profile_merge_and_bookmarks() {
        let mut profile = UserProfile {
            name: Some("Ada".to_string()),
            country: Some("UK".to_string()),
            ..Default::default()
        };
        profile.merge(&ProfilePatch {
            username: Some("ada".to_string()),
            preferences: Some(vec!["science".to_string()]),
            ..Default::default()
        });
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.username.as_deref(), Some("ada"));
        assert_eq!(profile.preferences, vec!["science"]);

        assert!(profile.add_bookmark("a1"));
        assert!(!profile.add_bookmark("a1"));
        assert_eq!(profile.bookmarked_articles, vec!["a1"]);
        assert!(profile.remove_bookmark("a1"));
        assert!(!profile.remove_bookmark("a1"));
        assert!(profile.bookmarked_articles.is_empty());
    }

    #[test]
    fn test_status_round_trip_through_str() {
        assert_eq!("failed".parse::<ProcessingStatus>().unwrap(), ProcessingStatus::Failed);
        assert!("pending_reclean".parse::<ProcessingStatus>().is_err());
    }
}
