use async_trait::async_trait;
use nr_core::{CallResult, CallableError, Caller, Error, Result};
use std::collections::HashMap;
use tracing::{error, info};

/// Resolves a bearer token to the identity behind it.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Caller>;
}

/// Fixed token table, configured as `uid:token` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, uid: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), uid.into());
        self
    }

    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut verifier = Self::new();
        for spec in specs {
            let spec = spec.as_ref();
            match spec.split_once(':') {
                Some((uid, token)) if !uid.is_empty() && !token.is_empty() => {
                    verifier = verifier.with_token(uid, token);
                }
                _ => return Err(Error::Config(format!("Invalid token spec '{}', expected uid:token", spec))),
            }
        }
        Ok(verifier)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Option<Caller> {
        self.tokens.get(token).map(Caller::new)
    }
}

/// The caller's uid, or `unauthenticated` when the call carried no identity.
pub fn verify_auth(caller: Option<&Caller>) -> CallResult<&str> {
    match caller {
        Some(caller) => {
            info!("🔑 Request authenticated for user {}", caller.uid);
            Ok(caller.uid.as_str())
        }
        None => {
            error!("Function called without authentication context");
            Err(CallableError::unauthenticated())
        }
    }
}
