use async_trait::async_trait;
use crate::types::SpeechAudio;
use crate::Result;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Turn text into encoded audio
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio>;
}
