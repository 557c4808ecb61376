use std::path::Path;

use anyhow::{Context, Result};

use crate::speech::types::AudioData;

/// Write 16-bit PCM audio as a WAV file
pub fn write_wav(path: &Path, audio: &AudioData) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {path:?}"))?;
    for chunk in audio.pcm_data.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
            .context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_written_wav_matches_pcm() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("speech.wav");
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN];
        let audio = AudioData {
            pcm_data: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            sample_rate: 16000,
            channels: 1,
        };

        write_wav(&path, &audio).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        let read: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }
}
