use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nr_core::{Article, ArticleView, CallableError, ErrorCode};
use nr_functions::articles::{ArticleRequest, ArticlesRequest};
use nr_functions::verify_auth;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};
use crate::AppState;

/// Callable failure rendered as `{"error": {"status", "message"}}`.
pub struct ApiError(pub CallableError);

impl From<CallableError> for ApiError {
    fn from(e: CallableError) -> Self {
        Self(e)
    }
}

fn status_code(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument | ErrorCode::FailedPrecondition => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "status": self.0.code.status(),
                "message": self.0.message,
            }
        });
        (status_code(self.0.code), Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallableRequest {
    #[serde(default)]
    data: Value,
}

pub async fn call_function(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: CallableRequest = if body.is_empty() {
        CallableRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| CallableError::invalid_argument("Request body must be a JSON object with a \"data\" field."))?
    };

    let caller = state.caller(&headers).await;
    info!("📞 Callable {} invoked", name);
    let result = state.functions.call(&name, caller.as_ref(), request.data).await?;
    Ok(Json(json!({ "result": result })))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(request): Query<ArticlesRequest>,
) -> Result<Json<Vec<ArticleView>>, ApiError> {
    let response = state.functions.articles.get_articles(request).await?;
    Ok(Json(response.articles))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ArticleView>, ApiError> {
    let response = state.functions.articles.get_article(ArticleRequest { id: Some(id) }).await?;
    Ok(Json(response.article))
}

/// Stores a raw article and runs the content sync on it, as a document
/// write would.
pub async fn put_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(mut article): Json<Article>,
) -> Result<Json<ArticleView>, ApiError> {
    let caller = state.caller(&headers).await;
    let uid = verify_auth(caller.as_ref())?;

    article.id = id;
    article.category = article.category.to_lowercase();
    info!("📝 Article {} written by {}", article.id, uid);

    let stored = state.functions.syncer.write_article(article).await.map_err(|e| {
        error!("❌ Failed to store article: {}", e);
        CallableError::internal("Could not store article.")
    })?;
    Ok(Json(stored.into()))
}
