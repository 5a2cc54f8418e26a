use std::sync::Arc;
use nr_core::{Error, Result, SpeechSynthesizer};
use tracing::info;
use crate::Config;

pub mod dummy;
pub mod http;

pub use dummy::DummySpeech;
pub use http::HttpSpeechClient;

pub async fn create_synthesizer(config: Option<Config>) -> Result<Arc<dyn SpeechSynthesizer>> {
    let config = config.unwrap_or_default();
    let synthesizer: Arc<dyn SpeechSynthesizer> = match config.model_name.as_str() {
        "http" => Arc::new(HttpSpeechClient::new(config.endpoint_url()?)),
        "dummy" => Arc::new(DummySpeech::new()),
        other => return Err(Error::Config(format!("Unsupported speech model: {}", other))),
    };
    info!("🔊 Speech synthesizer ready (using {})", synthesizer.name());
    Ok(synthesizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_synthesizer() {
        let synthesizer = create_synthesizer(None).await.unwrap();
        assert_eq!(synthesizer.name(), "HTTP");

        let config = Config { model_name: "dummy".to_string(), ..Default::default() };
        assert_eq!(create_synthesizer(Some(config)).await.unwrap().name(), "Dummy");

        let config = Config { model_name: "polly".to_string(), ..Default::default() };
        assert!(matches!(create_synthesizer(Some(config)).await, Err(Error::Config(_))));
    }
}
