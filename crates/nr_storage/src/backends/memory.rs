use async_trait::async_trait;
use nr_core::{
    Article, ArticleStorage, ContentUpdate, Error, KeywordQuery, ProfilePatch, ProfileStorage,
    RecentQuery, Result, UserProfile,
};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::{BackendConfig, StorageBackend};

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub config: BackendConfig,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self {
            config: BackendConfig::new("memory://", "articles"),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for MemoryConfig {
    type Target = BackendConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

fn same_category(article: &Article, category: Option<&str>) -> bool {
    category.map_or(true, |c| article.category.eq_ignore_ascii_case(c))
}

fn newest_first(mut articles: Vec<Article>, limit: usize) -> Vec<Article> {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at).then_with(|| a.id.cmp(&b.id)));
    articles.truncate(limit);
    articles
}

pub struct MemoryStore {
    articles: HashMap<String, Article>,
    profiles: HashMap<String, UserProfile>,
    keyword_index: bool,
}

impl MemoryStore {
    pub fn new(keyword_index: bool) -> Self {
        Self {
            articles: HashMap::new(),
            profiles: HashMap::new(),
            keyword_index,
        }
    }

    pub fn store_article(&mut self, article: &Article) {
        self.articles.insert(article.id.clone(), article.clone());
    }

    pub fn apply_update(&mut self, id: &str, update: &ContentUpdate) -> Result<()> {
        let article = self
            .articles
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
        article.apply(update);
        Ok(())
    }

    pub fn find_by_keywords(&self, query: &KeywordQuery) -> Result<Vec<Article>> {
        if !self.keyword_index {
            return Err(Error::IndexUnavailable("keyword index is disabled for this store".to_string()));
        }
        if query.keywords.is_empty() {
            return Ok(Vec::new());
        }
        let matches = self
            .articles
            .values()
            .filter(|a| a.processing_status == query.status)
            .filter(|a| same_category(a, query.category.as_deref()))
            .filter(|a| a.keywords.iter().any(|k| query.keywords.contains(k)))
            .cloned()
            .collect();
        Ok(newest_first(matches, query.limit))
    }

    pub fn recent(&self, query: &RecentQuery) -> Vec<Article> {
        let matches = self
            .articles
            .values()
            .filter(|a| query.status.map_or(true, |s| a.processing_status == s))
            .filter(|a| same_category(a, query.category.as_deref()))
            .cloned()
            .collect();
        newest_first(matches, query.limit)
    }

    pub fn profile_mut(&mut self, uid: &str) -> &mut UserProfile {
        self.profiles.entry(uid.to_string()).or_default()
    }
}

pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
    config: MemoryConfig,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_keyword_index(true)
    }

    /// A store whose keyword lookups fail with `IndexUnavailable`, as a
    /// document database does before its composite index is built.
    pub fn without_keyword_index() -> Self {
        Self::with_keyword_index(false)
    }

    fn with_keyword_index(keyword_index: bool) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(keyword_index))),
            config: MemoryConfig::new(),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn open(config: BackendConfig) -> Result<Self> where Self: Sized {
        let mut storage = Self::new();
        storage.config.config = config;
        Ok(storage)
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn store_article(&self, article: &Article) -> Result<()> {
        self.store.write().await.store_article(article);
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.store.read().await.articles.get(id).cloned())
    }

    async fn apply_update(&self, id: &str, update: &ContentUpdate) -> Result<()> {
        self.store.write().await.apply_update(id, update)
    }

    async fn find_by_keywords(&self, query: &KeywordQuery) -> Result<Vec<Article>> {
        self.store.read().await.find_by_keywords(query)
    }

    async fn recent(&self, query: &RecentQuery) -> Result<Vec<Article>> {
        Ok(self.store.read().await.recent(query))
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.store.read().await.articles.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl ProfileStorage for InMemoryStorage {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.store.read().await.profiles.get(uid).cloned())
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<()> {
        self.store.write().await.profile_mut(uid).merge(patch);
        Ok(())
    }

    async fn add_bookmark(&self, uid: &str, article_id: &str) -> Result<()> {
        self.store.write().await.profile_mut(uid).add_bookmark(article_id);
        Ok(())
    }

    async fn remove_bookmark(&self, uid: &str, article_id: &str) -> Result<()> {
        self.store.write().await.profile_mut(uid).remove_bookmark(article_id);
        Ok(())
    }
}
