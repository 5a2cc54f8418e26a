use futures::future::try_join_all;
use nr_core::{
    Article, ArticleStorage, ArticleView, CallResult, CallableError, ProcessingStatus, RecentQuery, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 50;
pub const MAX_FEED_CATEGORIES: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticlesRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleRequest {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedsRequest {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticlesResponse {
    pub articles: Vec<ArticleView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleResponse {
    pub article: ArticleView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedsResponse {
    pub feeds: BTreeMap<String, Vec<ArticleView>>,
}

fn feed_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
}

/// Read side for article listings.
pub struct ArticleService {
    articles: Arc<dyn ArticleStorage>,
}

impl ArticleService {
    pub fn new(articles: Arc<dyn ArticleStorage>) -> Self {
        Self { articles }
    }

    /// Newest completed articles, optionally in one category.
    pub async fn latest(&self, category: Option<&str>, limit: usize) -> Result<Vec<Article>> {
        self.articles
            .recent(&RecentQuery {
                category: category.filter(|c| !c.trim().is_empty()).map(str::to_lowercase),
                status: Some(ProcessingStatus::Completed),
                limit,
            })
            .await
    }

    pub async fn get_articles(&self, request: ArticlesRequest) -> CallResult<ArticlesResponse> {
        let articles = self
            .latest(request.category.as_deref(), feed_limit(request.limit))
            .await
            .map_err(|e| {
                error!("❌ Error fetching articles: {}", e);
                CallableError::internal("Could not fetch articles.")
            })?;

        Ok(ArticlesResponse {
            articles: articles.into_iter().map(ArticleView::from).collect(),
        })
    }

    pub async fn get_article(&self, request: ArticleRequest) -> CallResult<ArticleResponse> {
        let id = request
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CallableError::invalid_argument("Missing 'id'."))?;

        let article = self.articles.get_article(&id).await.map_err(|e| {
            error!("❌ Error fetching article {}: {}", id, e);
            CallableError::internal("Could not fetch article.")
        })?;

        match article {
            Some(article) => Ok(ArticleResponse { article: article.into() }),
            None => Err(CallableError::not_found("Article not found")),
        }
    }

    /// One listing per category, fetched concurrently.
    pub async fn get_category_feeds(&self, request: FeedsRequest) -> CallResult<FeedsResponse> {
        let mut seen = HashSet::new();
        let categories: Vec<String> = request
            .categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect();

        if categories.is_empty() {
            return Err(CallableError::invalid_argument("Missing 'categories'."));
        }
        if categories.len() > MAX_FEED_CATEGORIES {
            return Err(CallableError::invalid_argument(format!(
                "At most {} categories may be requested at once.",
                MAX_FEED_CATEGORIES
            )));
        }

        let limit = feed_limit(request.limit);
        info!("📰 Fetching feeds for {}", categories.join(", "));
        let listings = try_join_all(categories.iter().map(|c| self.latest(Some(c.as_str()), limit)))
            .await
            .map_err(|e| {
                error!("❌ Error fetching category feeds: {}", e);
                CallableError::internal("Could not fetch articles.")
            })?;

        let feeds = categories
            .into_iter()
            .zip(listings)
            .map(|(category, articles)| (category, articles.into_iter().map(ArticleView::from).collect()))
            .collect();
        Ok(FeedsResponse { feeds })
    }
}
