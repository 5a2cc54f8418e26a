use async_trait::async_trait;
use nr_core::{ArticleStorage, Error, ProfileStorage, Result};
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn open(config: BackendConfig) -> Result<Self> where Self: Sized;
}

/// Where a backend keeps its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub collection: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self { url: url.into(), collection: collection.into() }
    }

    pub fn with_url(&mut self, url: &str) {
        self.url = url.to_string();
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.url, self.collection)
    }
}

/// Article and profile handles backed by the same store.
#[derive(Clone)]
pub struct Storage {
    pub articles: Arc<dyn ArticleStorage>,
    pub profiles: Arc<dyn ProfileStorage>,
}

impl Storage {
    pub fn from_backend<T: ArticleStorage + ProfileStorage + 'static>(backend: T) -> Self {
        let backend = Arc::new(backend);
        Self {
            articles: backend.clone(),
            profiles: backend,
        }
    }
}

async fn open_backend<T>(config: BackendConfig) -> Result<Storage>
where
    T: StorageBackend + ArticleStorage + ProfileStorage + 'static,
{
    let location = config.to_string();
    let backend = T::open(config)
        .await
        .map_err(|e| Error::Storage(format!("{} ({}): {}", T::get_error_message(), location, e)))?;
    info!("💾 Storage ready at {}", location);
    Ok(Storage::from_backend(backend))
}

/// Open a backend by name. `location` overrides the backend's default URL.
pub async fn create_storage(kind: &str, location: Option<&str>) -> Result<Storage> {
    match kind {
        "memory" => {
            let mut config = memory::MemoryConfig::new().config;
            if let Some(location) = location {
                config.with_url(location);
            }
            open_backend::<InMemoryStorage>(config).await
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let mut config = sqlite::default_config();
            if let Some(location) = location {
                config.with_url(location);
            }
            open_backend::<SQLiteStorage>(config).await
        }
        other => Err(Error::Config(format!("Unsupported storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::{create_storage, BackendConfig, Storage, StorageBackend};
    pub use super::backends::*;
}
