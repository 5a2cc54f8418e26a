use axum::http::{header::AUTHORIZATION, HeaderMap};
use nr_core::Caller;
use nr_functions::{Functions, TokenVerifier};
use std::sync::Arc;

pub struct AppState {
    pub functions: Functions,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(functions: Functions, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { functions, verifier }
    }

    /// Identity from an `Authorization: Bearer <token>` header. Unknown
    /// tokens resolve to no caller.
    pub async fn caller(&self, headers: &HeaderMap) -> Option<Caller> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .trim();
        if token.is_empty() {
            return None;
        }
        self.verifier.verify(token).await
    }
}
