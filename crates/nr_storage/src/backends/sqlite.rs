use async_trait::async_trait;
use chrono::SecondsFormat;
use nr_core::{
    Article, ArticleStorage, ContentUpdate, Error, KeywordQuery, ProfilePatch, ProfileStorage,
    RecentQuery, Result, UserProfile,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use crate::{BackendConfig, StorageBackend};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        category TEXT NOT NULL,
        processing_status TEXT NOT NULL,
        published_at TEXT NOT NULL,
        keywords TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS articles_listing
        ON articles (processing_status, category, published_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        uid TEXT PRIMARY KEY,
        data TEXT NOT NULL
    )
    "#,
];

pub fn default_config() -> BackendConfig {
    BackendConfig::new("articles.db", "articles")
}

fn db_error(context: &str, e: sqlx::Error) -> Error {
    // json_each missing from the linked SQLite build
    if e.to_string().contains("no such function") || e.to_string().contains("no such table: json_each") {
        return Error::IndexUnavailable(format!("{}: {}", context, e));
    }
    Error::Database(format!("{}: {}", context, e))
}

/// Timestamps are stored in a fixed-width UTC form so text ordering is time ordering.
fn sortable_timestamp(article: &Article) -> String {
    article.published_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

async fn fetch_article(conn: &mut SqliteConnection, id: &str) -> Result<Option<Article>> {
    let row = sqlx::query("SELECT data FROM articles WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to get article", e))?;

    match row {
        Some(row) => {
            let data: String = row.get("data");
            Ok(Some(serde_json::from_str(&data)?))
        }
        None => Ok(None),
    }
}

async fn write_article(conn: &mut SqliteConnection, article: &Article) -> Result<()> {
    let keywords = serde_json::to_string(&article.keywords)?;
    let data = serde_json::to_string(article)?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO articles
        (id, category, processing_status, published_at, keywords, data)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&article.id)
    .bind(article.category.to_lowercase())
    .bind(article.processing_status.as_str())
    .bind(sortable_timestamp(article))
    .bind(keywords)
    .bind(data)
    .execute(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to store article", e))?;

    Ok(())
}

async fn fetch_profile(conn: &mut SqliteConnection, uid: &str) -> Result<Option<UserProfile>> {
    let row = sqlx::query("SELECT data FROM profiles WHERE uid = ?1")
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to get profile", e))?;

    match row {
        Some(row) => {
            let data: String = row.get("data");
            Ok(Some(serde_json::from_str(&data)?))
        }
        None => Ok(None),
    }
}

async fn write_profile(conn: &mut SqliteConnection, uid: &str, profile: &UserProfile) -> Result<()> {
    let data = serde_json::to_string(profile)?;
    sqlx::query(
        r#"
        INSERT INTO profiles (uid, data) VALUES (?1, ?2)
        ON CONFLICT(uid) DO UPDATE SET data = excluded.data
        "#,
    )
    .bind(uid)
    .bind(data)
    .execute(&mut *conn)
    .await
    .map_err(|e| db_error("Failed to write profile", e))?;
    Ok(())
}

/// Takes the database write lock before the first read, so a
/// read-modify-write cannot interleave with another writer.
async fn begin_immediate(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error("Failed to begin transaction", e))?;
    Ok(())
}

async fn finish<T: Send>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT")
                .execute(&mut *conn)
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                warn!("⚠️ Rollback failed: {}", rollback);
            }
            Err(e)
        }
    }
}

fn decode_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Article>> {
    rows.into_iter()
        .map(|row| {
            let data: String = row.get("data");
            Ok(serde_json::from_str(&data)?)
        })
        .collect()
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn get_error_message() -> &'static str {
        "SQLite database should be writable"
    }

    async fn open(config: BackendConfig) -> Result<Self> where Self: Sized {
        Self::new_with_path(Path::new(&config.url)).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    async fn connection(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))
    }

    async fn update_profile<F>(&self, uid: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut UserProfile) + Send,
    {
        let mut conn = self.connection().await?;
        begin_immediate(&mut conn).await?;

        let result = match fetch_profile(&mut conn, uid).await {
            Ok(profile) => {
                let mut profile = profile.unwrap_or_default();
                change(&mut profile);
                write_profile(&mut conn, uid, &profile).await
            }
            Err(e) => Err(e),
        };
        finish(&mut conn, result).await
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn store_article(&self, article: &Article) -> Result<()> {
        let mut conn = self.connection().await?;
        write_article(&mut conn, article).await
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let mut conn = self.connection().await?;
        fetch_article(&mut conn, id).await
    }

    async fn apply_update(&self, id: &str, update: &ContentUpdate) -> Result<()> {
        let mut conn = self.connection().await?;
        begin_immediate(&mut conn).await?;

        let result = match fetch_article(&mut conn, id).await {
            Ok(Some(mut article)) => {
                article.apply(update);
                write_article(&mut conn, &article).await
            }
            Ok(None) => Err(Error::NotFound(format!("article {}", id))),
            Err(e) => Err(e),
        };
        finish(&mut conn, result).await
    }

    async fn find_by_keywords(&self, query: &KeywordQuery) -> Result<Vec<Article>> {
        if query.keywords.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = serde_json::to_string(&query.keywords)?;

        let rows = sqlx::query(
            r#"
            SELECT data FROM articles
            WHERE processing_status = ?1
              AND (?2 IS NULL OR category = ?2)
              AND EXISTS (
                SELECT 1 FROM json_each(articles.keywords) AS k
                WHERE k.value IN (SELECT value FROM json_each(?3))
              )
            ORDER BY published_at DESC, id ASC
            LIMIT ?4
            "#,
        )
        .bind(query.status.as_str())
        .bind(query.category.as_deref().map(str::to_lowercase))
        .bind(wanted)
        .bind(query.limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to find articles by keywords", e))?;

        decode_rows(rows)
    }

    async fn recent(&self, query: &RecentQuery) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM articles
            WHERE (?1 IS NULL OR processing_status = ?1)
              AND (?2 IS NULL OR category = ?2)
            ORDER BY published_at DESC, id ASC
            LIMIT ?3
            "#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.category.as_deref().map(str::to_lowercase))
        .bind(query.limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| db_error("Failed to list recent articles", e))?;

        decode_rows(rows)
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM articles ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| db_error("Failed to list article ids", e))?;
        Ok(rows.into_iter().map(|row| row.get::<String, _>("id")).collect())
    }
}

#[async_trait]
impl ProfileStorage for SQLiteStorage {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let mut conn = self.connection().await?;
        fetch_profile(&mut conn, uid).await
    }

    async fn merge_profile(&self, uid: &str, patch: &ProfilePatch) -> Result<()> {
        self.update_profile(uid, |profile| profile.merge(patch)).await
    }

    async fn add_bookmark(&self, uid: &str, article_id: &str) -> Result<()> {
        self.update_profile(uid, |profile| {
            profile.add_bookmark(article_id);
        })
        .await
    }

    async fn remove_bookmark(&self, uid: &str, article_id: &str) -> Result<()> {
        self.update_profile(uid, |profile| {
            profile.remove_bookmark(article_id);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use nr_core::ProcessingStatus;
    use tempfile::tempdir;

    fn completed(id: &str, category: &str, keywords: &[&str], age_hours: i64) -> Article {
        let mut article = Article::new(id, category, "<p>raw</p>")
            .with_published_at(Utc::now() - Duration::hours(age_hours));
        article.keywords = keywords.iter().map(|k| k.to_string()).collect();
        article.processing_status = ProcessingStatus::Completed;
        article
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db")).await.unwrap();

        storage.store_article(&completed("old", "technology", &["robots", "future"], 48)).await.unwrap();
        storage.store_article(&completed("new", "technology", &["future"], 1)).await.unwrap();
        storage.store_article(&completed("sport", "sports", &["league"], 2)).await.unwrap();
        storage.store_article(&Article::new("pending", "technology", "raw")).await.unwrap();

        let found = storage
            .find_by_keywords(&KeywordQuery {
                keywords: vec!["robots".to_string(), "future".to_string()],
                category: Some("Technology".to_string()),
                status: ProcessingStatus::Completed,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(found.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["new", "old"]);

        let recent = storage
            .recent(&RecentQuery { category: None, status: Some(ProcessingStatus::Completed), limit: 2 })
            .await
            .unwrap();
        assert_eq!(recent.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["new", "sport"]);

        let update = ContentUpdate {
            content: "raw".to_string(),
            keywords: vec![],
            processing_status: ProcessingStatus::Failed,
            updated_at: Utc::now(),
        };
        storage.apply_update("pending", &update).await.unwrap();
        let article = storage.get_article("pending").await.unwrap().unwrap();
        assert_eq!(article.processing_status, ProcessingStatus::Failed);
        assert_eq!(article.full_clean_content.as_deref(), Some("raw"));

        assert_eq!(storage.list_ids().await.unwrap(), vec!["new", "old", "pending", "sport"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookmarks_are_all_kept() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(SQLiteStorage::new_with_path(&temp_dir.path().join("race.db")).await.unwrap());

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.add_bookmark("u1", &format!("a{}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let profile = storage.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.bookmarked_articles.len(), 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_and_merges() {
        let temp_dir = tempdir().unwrap();
        let storage = Arc::new(SQLiteStorage::new_with_path(&temp_dir.path().join("mixed.db")).await.unwrap());
        storage.store_article(&Article::new("a1", "general", "raw")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let update = ContentUpdate {
                    content: format!("pass {}", i),
                    keywords: vec![],
                    processing_status: ProcessingStatus::Completed,
                    updated_at: Utc::now(),
                };
                storage.apply_update("a1", &update).await?;
                storage.add_bookmark("u1", &format!("b{}", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let article = storage.get_article("a1").await.unwrap().unwrap();
        assert!(article.content.starts_with("pass "));
        assert_eq!(article.full_clean_content.as_deref(), Some("raw"));
        assert_eq!(storage.get_profile("u1").await.unwrap().unwrap().bookmarked_articles.len(), 20);
    }

    #[tokio::test]
    async fn test_sqlite_profiles() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("profiles.db")).await.unwrap();

        storage.add_bookmark("u1", "a1").await.unwrap();
        storage.add_bookmark("u1", "a2").await.unwrap();
        storage.remove_bookmark("u1", "a1").await.unwrap();
        storage
            .merge_profile("u1", &ProfilePatch { username: Some("reader".to_string()), ..Default::default() })
            .await
            .unwrap();

        let profile = storage.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.bookmarked_articles, vec!["a2"]);
        assert_eq!(profile.username.as_deref(), Some("reader"));
        assert!(storage.get_profile("u2").await.unwrap().is_none());
    }
}
