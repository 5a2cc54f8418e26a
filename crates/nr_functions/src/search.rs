use nr_core::{
    Article, ArticleStorage, ArticleView, CallResult, CallableError, Error, KeywordQuery,
    ProcessingStatus, RecentQuery, Result,
};
use nr_text::{extract_keywords, KeywordOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_SEARCH_LIMIT: usize = 25;
pub const MAX_SEARCH_LIMIT: usize = 50;
/// Recent documents scanned when the keyword index cannot be used.
pub const FALLBACK_WINDOW: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub articles: Vec<ArticleView>,
}

pub struct SearchService {
    articles: Arc<dyn ArticleStorage>,
}

impl SearchService {
    pub fn new(articles: Arc<dyn ArticleStorage>) -> Self {
        Self { articles }
    }

    pub async fn semantic_search(&self, uid: &str, request: SearchRequest) -> CallResult<SearchResponse> {
        info!("🔍 Keyword search initiated by {}", uid);

        let query = request
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| {
                CallableError::invalid_argument(
                    "The function must be called with a non-empty string \"query\" argument.",
                )
            })?;
        let category = request.category.filter(|c| !c.trim().is_empty());
        let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

        let articles = self.find(&query, category.as_deref(), limit).await.map_err(|e| {
            error!("❌ Error during keyword search: {}", e);
            match e {
                Error::IndexUnavailable(_) => CallableError::failed_precondition(
                    "Search failed. This query needs a keyword index the store does not have yet.",
                ),
                _ => CallableError::internal("Search failed to execute."),
            }
        })?;

        info!("✅ Returning {} matching articles", articles.len());
        Ok(SearchResponse {
            articles: articles.into_iter().map(ArticleView::from).collect(),
        })
    }

    /// Completed articles sharing a keyword with `query`, newest first. Falls
    /// back to a substring scan of recent articles when the store reports
    /// `IndexUnavailable`; if that also fails the index error is returned.
    pub async fn find(&self, query: &str, category: Option<&str>, limit: usize) -> Result<Vec<Article>> {
        let keywords = extract_keywords(query, KeywordOptions::query());
        if keywords.is_empty() {
            info!("No usable keywords in query");
            return Ok(Vec::new());
        }
        info!(
            "Keyword search: keywords=[{}], category={}",
            keywords.join(", "),
            category.unwrap_or("None")
        );

        let keyword_query = KeywordQuery {
            keywords,
            category: category.map(str::to_lowercase),
            status: ProcessingStatus::Completed,
            limit,
        };

        match self.articles.find_by_keywords(&keyword_query).await {
            Err(Error::IndexUnavailable(reason)) => {
                warn!("⚠️ Keyword index unavailable ({}), scanning recent articles", reason);
                self.substring_fallback(query, keyword_query.category, limit)
                    .await
                    .map_err(|e| {
                        error!("❌ Substring fallback failed: {}", e);
                        Error::IndexUnavailable(reason)
                    })
            }
            other => other,
        }
    }

    async fn substring_fallback(&self, query: &str, category: Option<String>, limit: usize) -> Result<Vec<Article>> {
        let recent = self
            .articles
            .recent(&RecentQuery {
                category,
                status: Some(ProcessingStatus::Completed),
                limit: FALLBACK_WINDOW,
            })
            .await?;

        let needle = query.trim().to_lowercase();
        Ok(recent
            .into_iter()
            .filter(|article| article.searchable_text().to_lowercase().contains(&needle))
            .take(limit)
            .collect())
    }
}
