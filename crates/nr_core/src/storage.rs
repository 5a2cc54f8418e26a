use async_trait::async_trait;
use crate::types::{Article, ContentUpdate, KeywordQuery, ProfilePatch, RecentQuery, UserProfile};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert or replace an article by id
    async fn store_article(&self, article: &Article) -> Result<()>;

    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    /// Write the derived fields of an existing article
    async fn apply_update(&self, id: &str, update: &ContentUpdate) -> Result<()>;

    /// Articles whose keyword set intersects `query.keywords`, newest first.
    /// Returns `Error::IndexUnavailable` when the backend cannot serve the lookup.
    async fn find_by_keywords(&self, query: &KeywordQuery) -> Result<Vec<Article>>;

    /// Newest-first window, optionally filtered by category and status
    async fn recent(&self, query: &RecentQuery) -> Result<Vec<Article>>;

    /// Ids of every stored article
    async fn list_ids(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ProfileStorage: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>>;

    /// Merge-write: creates the profile when missing
    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<()>;

    async fn add_bookmark(&self, uid: &str, article_id: &str) -> Result<()>;

    async fn remove_bookmark(&self, uid: &str, article_id: &str) -> Result<()>;
}
