use chrono::Utc;
use nr_core::{Article, ArticleStorage, ContentUpdate, ProcessingStatus, Result};
use nr_text::{extract_keywords, Cleaner, KeywordOptions};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Derives `content` and `keywords` from an article's raw body.
#[derive(Debug, Clone, Default)]
pub struct ContentSync {
    cleaner: Cleaner,
}

impl ContentSync {
    pub fn new(cleaner: Cleaner) -> Self {
        Self { cleaner }
    }

    /// Reaction to a document write. `None` means nothing to write back: the
    /// document is gone, has no raw body, or was already processed from the
    /// same raw body (which is also what our own update looks like).
    pub fn on_write(&self, before: Option<&Article>, after: Option<&Article>) -> Option<ContentUpdate> {
        let after = after?;
        let raw = after.full_clean_content.as_deref()?;

        let previous_raw = before.and_then(|b| b.full_clean_content.as_deref());
        if previous_raw == Some(raw) && after.processing_status != ProcessingStatus::Pending {
            return None;
        }

        Some(self.process(raw))
    }

    pub fn process(&self, raw: &str) -> ContentUpdate {
        let content = self.cleaner.clean(raw);
        let keywords = extract_keywords(&content, KeywordOptions::document());
        let processing_status = if content.is_empty() && !raw.trim().is_empty() {
            ProcessingStatus::Failed
        } else {
            ProcessingStatus::Completed
        };

        ContentUpdate {
            content,
            keywords,
            processing_status,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs [`ContentSync`] against a store and writes the results back.
pub struct ContentSyncer {
    sync: ContentSync,
    articles: Arc<dyn ArticleStorage>,
}

impl ContentSyncer {
    pub fn new(sync: ContentSync, articles: Arc<dyn ArticleStorage>) -> Self {
        Self { sync, articles }
    }

    /// Applies the on-write reaction. Storage errors are logged and swallowed
    /// so the triggering write never fails because of the sync.
    pub async fn handle_write(&self, before: Option<&Article>, after: Option<&Article>) -> Option<ContentUpdate> {
        let article = after?;
        let update = self.sync.on_write(before, Some(article))?;

        match self.articles.apply_update(&article.id, &update).await {
            Ok(()) => {
                info!(
                    "✅ Cleaned article {} - length {} - keywords {}",
                    article.id,
                    update.content.chars().count(),
                    update.keywords.len()
                );
                Some(update)
            }
            Err(e) => {
                error!("❌ Content sync failed for {}: {}", article.id, e);
                None
            }
        }
    }

    /// Stores a raw article and fires the on-write reaction for it. A rewrite
    /// that keeps the stored raw body and is not `pending` keeps the stored
    /// derived fields, since the reaction will not regenerate them.
    pub async fn write_article(&self, mut article: Article) -> Result<Article> {
        let before = self.articles.get_article(&article.id).await?;
        if let Some(previous) = before.as_ref() {
            let same_raw = previous.full_clean_content.is_some()
                && previous.full_clean_content == article.full_clean_content;
            if same_raw && article.processing_status != ProcessingStatus::Pending {
                article.content = previous.content.clone();
                article.keywords = previous.keywords.clone();
                article.processing_status = previous.processing_status;
                article.updated_at = previous.updated_at;
            }
        }
        self.articles.store_article(&article).await?;
        self.handle_write(before.as_ref(), Some(&article)).await;

        Ok(self.articles.get_article(&article.id).await?.unwrap_or(article))
    }

    /// Re-cleans every stored article that has a raw body, regardless of its
    /// current status.
    pub async fn backfill(&self) -> Result<BackfillReport> {
        let ids = self.articles.list_ids().await?;
        info!("📰 Found {} articles to re-clean", ids.len());

        let mut report = BackfillReport::default();
        for id in ids {
            let article = match self.articles.get_article(&id).await {
                Ok(Some(article)) => article,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("❌ Failed to load {}: {}", id, e);
                    report.failed += 1;
                    continue;
                }
            };

            let raw = match article.full_clean_content.as_deref() {
                Some(raw) if !raw.trim().is_empty() => raw,
                _ => {
                    warn!("⚠️ Skipping {} (no raw content)", id);
                    report.skipped += 1;
                    continue;
                }
            };

            let update = self.sync.process(raw);
            match self.articles.apply_update(&id, &update).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    error!("❌ Failed to update {}: {}", id, e);
                    report.failed += 1;
                }
            }

            let seen = report.processed + report.failed;
            if seen > 0 && seen % 25 == 0 {
                info!("✅ Re-cleaned {} so far", seen);
            }
        }

        info!(
            "🎉 Backfill done: {} processed, {} skipped, {} failed",
            report.processed, report.skipped, report.failed
        );
        Ok(report)
    }
}
