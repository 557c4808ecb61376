use anyhow::Result;
use async_trait::async_trait;

use super::types::{SynthesisResult, Voice};

/// Trait for text-to-speech providers
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Get the default voice for this provider
    fn default_voice(&self) -> Voice;

    /// Synthesize text to speech audio. Requests the service refuses come
    /// back as [`SynthesisResult::Canceled`]; only transport failures are
    /// errors.
    async fn synthesize(&self, text: &str, voice: Option<&Voice>) -> Result<SynthesisResult>;

    /// List available voices
    async fn list_voices(&self) -> Result<Vec<Voice>>;
}
