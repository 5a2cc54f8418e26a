use nr_core::Result;
use url::Url;

pub mod models;

pub const DEFAULT_TTS_ENDPOINT: &str = "http://localhost:8080/tts";

/// Which synthesizer to build and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub model_name: String,
    pub endpoint: String,
}

impl Config {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint)
            .map_err(|e| nr_core::Error::Config(format!("Invalid TTS endpoint {}: {}", self.endpoint, e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: "http".to_string(),
            endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
        }
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::models::create_synthesizer;
    pub use nr_core::{Result, Error, SpeechAudio, SpeechSynthesizer};
}

pub use models::create_synthesizer;
