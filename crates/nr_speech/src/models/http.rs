use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use nr_core::{Error, Result, SpeechAudio, SpeechSynthesizer};

const DEFAULT_MIME_TYPE: &str = "audio/wav";

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct SynthesisResponse {
    #[serde(default)]
    audio_base64: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Client for a speech service that takes `{"text"}` and answers with
/// base64 audio.
pub struct HttpSpeechClient {
    client: Arc<Client>,
    endpoint: Url,
}

impl HttpSpeechClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for HttpSpeechClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSpeechClient")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechClient {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn synthesize(&self, text: &str) -> Result<SpeechAudio> {
        let response = self.client
            .post(self.endpoint.clone())
            .json(&SynthesisRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Speech(format!("TTS service returned {}: {}", status, body)));
        }

        let payload = response.json::<SynthesisResponse>().await?;
        let audio_base64 = payload
            .audio_base64
            .filter(|audio| !audio.is_empty())
            .ok_or_else(|| Error::Speech("No audio content in TTS service response".to_string()))?;

        Ok(SpeechAudio {
            audio_base64,
            mime_type: payload.mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        })
    }
}
