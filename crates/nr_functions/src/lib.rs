//! Server-side operations: the on-write content sync and the callable
//! entry points exposed to clients.

use nr_core::{CallResult, CallableError, Caller, SpeechSynthesizer};
use nr_storage::Storage;
use nr_text::Cleaner;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

pub mod articles;
pub mod auth;
pub mod profile;
pub mod search;
pub mod sync;
pub mod tts;

pub use articles::ArticleService;
pub use auth::{verify_auth, StaticTokenVerifier, TokenVerifier};
pub use profile::ProfileService;
pub use search::SearchService;
pub use sync::{BackfillReport, ContentSync, ContentSyncer};
pub use tts::TtsService;

/// Names accepted by [`Functions::call`].
pub const CALLABLES: &[&str] = &[
    "semanticSearch",
    "generateTTS",
    "getUserProfile",
    "updateUserProfile",
    "bookmarkArticle",
    "removeBookmark",
    "getArticles",
    "getArticle",
    "getCategoryFeeds",
];

/// Every service wired to one storage and one speech backend.
pub struct Functions {
    pub search: SearchService,
    pub profiles: ProfileService,
    pub tts: TtsService,
    pub articles: ArticleService,
    pub syncer: ContentSyncer,
}

impl Functions {
    pub fn new(storage: &Storage, speech: Arc<dyn SpeechSynthesizer>, cleaner: Cleaner) -> Self {
        Self {
            search: SearchService::new(storage.articles.clone()),
            profiles: ProfileService::new(storage.profiles.clone()),
            tts: TtsService::new(speech),
            articles: ArticleService::new(storage.articles.clone()),
            syncer: ContentSyncer::new(ContentSync::new(cleaner), storage.articles.clone()),
        }
    }

    /// Runs a callable by name with a JSON payload, as received in the
    /// `data` field of a callable request.
    pub async fn call(&self, name: &str, caller: Option<&Caller>, data: Value) -> CallResult<Value> {
        if !CALLABLES.contains(&name) {
            return Err(CallableError::not_found(format!("Unknown function '{}'.", name)));
        }
        let uid = verify_auth(caller)?;

        match name {
            "semanticSearch" => {
                let request = parse(data, "The function must be called with a non-empty string \"query\" argument.")?;
                to_value(self.search.semantic_search(uid, request).await?)
            }
            "generateTTS" => {
                let request = parse(data, "The function must be called with a non-empty string \"text\" argument.")?;
                to_value(self.tts.generate_tts(uid, request).await?)
            }
            "getUserProfile" => to_value(self.profiles.get_user_profile(uid).await?),
            "updateUserProfile" => {
                let request = parse(data, "Missing or invalid 'profileData'.")?;
                to_value(self.profiles.update_user_profile(uid, request).await?)
            }
            "bookmarkArticle" => {
                let request = parse(data, "Missing 'articleId'.")?;
                to_value(self.profiles.bookmark_article(uid, request).await?)
            }
            "removeBookmark" => {
                let request = parse(data, "Missing 'articleId'.")?;
                to_value(self.profiles.remove_bookmark(uid, request).await?)
            }
            "getArticles" => {
                let request = parse(data, "Invalid 'category' or 'limit'.")?;
                to_value(self.articles.get_articles(request).await?)
            }
            "getArticle" => {
                let request = parse(data, "Missing 'id'.")?;
                to_value(self.articles.get_article(request).await?)
            }
            "getCategoryFeeds" => {
                let request = parse(data, "Missing 'categories'.")?;
                to_value(self.articles.get_category_feeds(request).await?)
            }
            _ => Err(CallableError::not_found(format!("Unknown function '{}'.", name))),
        }
    }
}

/// `null` stands for an empty payload.
fn parse<T: DeserializeOwned + Default>(data: Value, message: &str) -> CallResult<T> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|_| CallableError::invalid_argument(message))
}

fn to_value<T: Serialize>(response: T) -> CallResult<Value> {
    serde_json::to_value(response).map_err(|e| {
        error!("❌ Failed to encode response: {}", e);
        CallableError::internal("Could not encode response.")
    })
}

pub mod prelude {
    pub use super::{BackfillReport, ContentSync, ContentSyncer, Functions, StaticTokenVerifier, TokenVerifier};
    pub use nr_core::{CallResult, CallableError, Caller, ErrorCode};
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_core::{Article, ErrorCode};
    use nr_speech::models::DummySpeech;
    use serde_json::json;

    async fn functions() -> Functions {
        let storage = nr_storage::create_storage("memory", None).await.unwrap();
        Functions::new(&storage, Arc::new(DummySpeech::new()), Cleaner::default())
    }

    #[tokio::test]
    async fn test_every_callable_requires_auth() {
        let functions = functions().await;
        for name in CALLABLES {
            let err = functions.call(name, None, json!({})).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::Unauthenticated, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_unknown_callable() {
        let functions = functions().await;
        let caller = Caller::new("u1");
        let err = functions.call("deleteEverything", Some(&caller), json!({})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_payload_shapes() {
        let functions = functions().await;
        let caller = Caller::new("u1");

        let err = functions.call("semanticSearch", Some(&caller), json!({ "query": 42 })).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        let err = functions.call("updateUserProfile", Some(&caller), json!({ "profileData": "x" })).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);

        let profile = functions.call("getUserProfile", Some(&caller), Value::Null).await.unwrap();
        assert_eq!(profile, json!({ "profile": {} }));
    }

    #[tokio::test]
    async fn test_write_then_search_end_to_end() {
        let functions = functions().await;
        let caller = Caller::new("u1");
        let raw = "<p>Researchers unveiled a battery that charges electric cars in five minutes.</p>\n\
                   <p>The battery uses a silicon anode and survived thousands of charging cycles in tests.</p>";
        functions.syncer.write_article(Article::new("e1", "technology", raw)).await.unwrap();

        let result = functions
            .call("semanticSearch", Some(&caller), json!({ "query": "battery breakthrough" }))
            .await
            .unwrap();
        assert_eq!(result["articles"][0]["id"], "e1");
        assert!(result["articles"][0].get("full_clean_content").is_none());

        let bookmarked = functions
            .call("bookmarkArticle", Some(&caller), json!({ "articleId": "e1" }))
            .await
            .unwrap();
        assert_eq!(bookmarked, json!({ "success": true, "message": "Article bookmarked." }));

        let profile = functions.call("getUserProfile", Some(&caller), json!({})).await.unwrap();
        assert_eq!(profile["profile"]["bookmarkedArticles"], json!(["e1"]));

        let audio = functions.call("generateTTS", Some(&caller), json!({ "text": "hello" })).await.unwrap();
        assert_eq!(audio["mime_type"], "audio/wav");
    }
}
