use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/callable/:name", post(handlers::call_function))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:id", get(handlers::get_article).put(handlers::put_article))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves the app until the process stops.
pub async fn serve(state: AppState, addr: &str) -> nr_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use nr_core::{Article, Result, Error};
    pub use crate::{create_app, serve, AppState};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use nr_functions::{Functions, StaticTokenVerifier};
    use nr_speech::models::DummySpeech;
    use nr_text::Cleaner;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let storage = nr_storage::create_storage("memory", None).await.unwrap();
        let functions = Functions::new(&storage, Arc::new(DummySpeech::new()), Cleaner::default());
        let verifier = StaticTokenVerifier::new().with_token("u1", "secret");
        create_app(AppState::new(functions, Arc::new(verifier)))
    }

    fn callable(name: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/callable/{}", name))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_callable_envelope() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(callable("getUserProfile", Some("secret"), json!({ "data": {} })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "result": { "profile": {} } }));

        let response = app
            .clone()
            .oneshot(callable("semanticSearch", Some("secret"), json!({ "data": { "query": "" } })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["status"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_callable_requires_valid_token() {
        let app = app().await;
        for token in [None, Some("wrong")] {
            let response = app
                .clone()
                .oneshot(callable("getUserProfile", token, json!({ "data": {} })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = json_body(response).await;
            assert_eq!(body["error"]["status"], "UNAUTHENTICATED");
            assert_eq!(body["error"]["message"], "The function must be called while authenticated.");
        }
    }

    #[tokio::test]
    async fn test_put_article_runs_content_sync() {
        let app = app().await;
        let article = json!({
            "title": "Harbour bridge reopens",
            "category": "General",
            "full_clean_content": "<div><p>The harbour bridge reopened to traffic this morning after repairs.</p>\
                <script>ads()</script><p>Commuters said the detour had added an hour to their daily journeys.</p></div>"
        });

        let request = Request::builder()
            .method("PUT")
            .uri("/api/articles/h1")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, "Bearer secret")
            .body(Body::from(article.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = json_body(response).await;
        assert_eq!(stored["processing_status"], "completed");
        assert_eq!(stored["category"], "general");
        assert!(!stored["content"].as_str().unwrap().contains("ads()"));

        let request = Request::builder().uri("/api/articles/h1").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.get("full_clean_content").is_none());

        let request = Request::builder().uri("/api/articles?category=general").body(Body::empty()).unwrap();
        let listed = json_body(app.clone().oneshot(request).await.unwrap()).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let request = Request::builder().uri("/api/articles/missing").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_article_requires_token() {
        let request = Request::builder()
            .method("PUT")
            .uri("/api/articles/h1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "full_clean_content": "text" }).to_string()))
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
