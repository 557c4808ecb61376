use anyhow::Result;

use super::provider::TextToSpeech;
use super::types::SynthesisResult;
use crate::audio::AudioOutput;

/// Speaks text through a provider and sends completed audio to an output
pub struct SpeechSynthesizer {
    provider: Box<dyn TextToSpeech>,
    output: AudioOutput,
}

impl SpeechSynthesizer {
    pub fn new(provider: Box<dyn TextToSpeech>, output: AudioOutput) -> Self {
        Self { provider, output }
    }

    /// Synthesize `text` with the provider's default voice. Audio is only
    /// written when synthesis completed; a canceled result is returned as-is.
    pub async fn speak_text(&self, text: &str) -> Result<SynthesisResult> {
        let result = self.provider.synthesize(text, None).await?;

        match &result {
            SynthesisResult::Completed(audio) => {
                tracing::info!(
                    bytes = audio.pcm_data.len(),
                    duration_ms = audio.duration_ms(),
                    "speech synthesized"
                );
                self.output.write(audio).await?;
            }
            SynthesisResult::Canceled(details) => {
                tracing::warn!(
                    reason = %details.reason,
                    error_code = ?details.error_code,
                    "speech synthesis canceled"
                );
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::types::{AudioData, CancellationDetails, CancellationReason, Voice};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct Scripted {
        result: SynthesisResult,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextToSpeech for Scripted {
        fn default_voice(&self) -> Voice {
            Voice::from_short_name("en-US-AndrewNeural")
        }

        async fn synthesize(&self, text: &str, _voice: Option<&Voice>) -> Result<SynthesisResult> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.result.clone())
        }

        async fn list_voices(&self) -> Result<Vec<Voice>> {
            Ok(vec![self.default_voice()])
        }
    }

    fn audio() -> AudioData {
        AudioData {
            pcm_data: vec![1, 0, 2, 0],
            sample_rate: 16000,
            channels: 1,
        }
    }

    #[tokio::test]
    async fn test_completed_audio_is_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let synthesizer = SpeechSynthesizer::new(
            Box::new(Scripted {
                result: SynthesisResult::Completed(audio()),
                seen: seen.clone(),
            }),
            AudioOutput::WavFile(path.clone()),
        );

        let result = synthesizer.speak_text("Hello world").await.unwrap();

        assert!(result.is_completed());
        assert!(path.exists());
        assert_eq!(*seen.lock().unwrap(), vec!["Hello world".to_string()]);
    }

    #[tokio::test]
    async fn test_canceled_result_skips_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let canceled = SynthesisResult::Canceled(CancellationDetails {
            reason: CancellationReason::Error,
            error_code: None,
            error_details: "boom".to_string(),
        });
        let synthesizer = SpeechSynthesizer::new(
            Box::new(Scripted {
                result: canceled.clone(),
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            AudioOutput::WavFile(path.clone()),
        );

        let result = synthesizer.speak_text("Hello").await.unwrap();

        assert_eq!(result, canceled);
        assert!(!path.exists());
    }
}
