use std::fmt;
use nr_core::{Error, Result, SpeechAudio, SpeechSynthesizer};

/// Answers locally without any speech service. `failing()` builds one that
/// always errors.
pub struct DummySpeech {
    fail: bool,
}

impl fmt::Debug for DummySpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummySpeech").field("fail", &self.fail).finish()
    }
}

impl DummySpeech {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for DummySpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for DummySpeech {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn synthesize(&self, text: &str) -> Result<SpeechAudio> {
        if self.fail {
            return Err(Error::Speech("dummy synthesizer configured to fail".to_string()));
        }
        // Byte count of the text, so callers can tell requests apart
        Ok(SpeechAudio {
            audio_base64: format!("ZHVtbXk={}", text.len()),
            mime_type: "audio/wav".to_string(),
        })
    }
}
