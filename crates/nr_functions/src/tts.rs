use nr_core::{CallResult, CallableError, SpeechAudio, SpeechSynthesizer};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

const LOG_PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: Option<String>,
}

pub struct TtsService {
    speech: Arc<dyn SpeechSynthesizer>,
}

impl TtsService {
    pub fn new(speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { speech }
    }

    pub async fn generate_tts(&self, uid: &str, request: TtsRequest) -> CallResult<SpeechAudio> {
        info!("🔊 TTS request from {}", uid);
        let text = request.text.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            CallableError::invalid_argument("The function must be called with a non-empty string \"text\" argument.")
        })?;

        let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        info!("Sending text to {} speech service: \"{}...\"", self.speech.name(), preview);

        let audio = self.speech.synthesize(&text).await.map_err(|e| {
            error!("❌ Error calling speech service: {}", e);
            CallableError::internal("Failed to generate speech. Please try again later.")
        })?;

        info!("✨ Received audio from speech service");
        Ok(audio)
    }
}
