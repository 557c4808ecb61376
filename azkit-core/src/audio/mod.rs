//! Where synthesized speech ends up

#[cfg(feature = "audio")]
pub mod playback;
pub mod wav;

use std::path::PathBuf;

use anyhow::Result;

use crate::speech::types::AudioData;

/// Destination for completed synthesis audio
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AudioOutput {
    /// Default output device of the host
    #[default]
    Speaker,
    WavFile(PathBuf),
    /// Discard the audio, only report the outcome
    Discard,
}

impl AudioOutput {
    pub async fn write(&self, audio: &AudioData) -> Result<()> {
        match self {
            AudioOutput::Speaker => play_on_speaker(audio).await,
            AudioOutput::WavFile(path) => {
                wav::write_wav(path, audio)?;
                tracing::info!(?path, "wrote synthesized audio");
                Ok(())
            }
            AudioOutput::Discard => Ok(()),
        }
    }
}

#[cfg(feature = "audio")]
async fn play_on_speaker(audio: &AudioData) -> Result<()> {
    let player = playback::AudioPlayer::new()?;
    let handle = player.play(audio.clone())?;
    handle.wait().await;
    tracing::debug!(duration_ms = audio.duration_ms(), "playback finished");
    Ok(())
}

#[cfg(not(feature = "audio"))]
async fn play_on_speaker(_audio: &AudioData) -> Result<()> {
    anyhow::bail!("speaker playback requires the `audio` feature; write to a WAV file instead")
}
