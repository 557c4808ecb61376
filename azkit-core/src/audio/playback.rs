//! Speaker playback using cpal
//! Synthesized PCM is converted to the device's native rate and channel count

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig, SupportedStreamConfig,
};
use rubato::{FftFixedIn, Resampler};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::speech::types::AudioData;

const RESAMPLE_CHUNK: usize = 1024;

/// Default output device, opened once per speak
pub struct AudioPlayer {
    device: Device,
    supported_config: SupportedStreamConfig,
}

/// Audio playback handle - dropping stops playback (RAII)
pub struct AudioPlayback {
    _stream: Stream,
    finished: Arc<AtomicBool>,
}

impl AudioPlayback {
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Wait for playback to complete
    pub async fn wait(&self) {
        while !self.is_finished() {
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
    }
}

impl AudioPlayer {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no output device available")?;

        let supported_config = device
            .default_output_config()
            .context("failed to get default output config")?;

        tracing::debug!(
            device_name = ?device.name(),
            native_sample_rate = supported_config.sample_rate().0,
            native_channels = supported_config.channels(),
            native_format = ?supported_config.sample_format(),
            "audio output initialized"
        );

        Ok(Self {
            device,
            supported_config,
        })
    }

    /// Start playing, returns handle that stops on drop
    pub fn play(&self, audio: AudioData) -> Result<AudioPlayback> {
        let native_rate = self.supported_config.sample_rate().0;
        let native_channels = self.supported_config.channels() as usize;
        let config: StreamConfig = self.supported_config.clone().into();

        let samples = Arc::new(prepare_samples(&audio, native_rate, native_channels)?);
        let position = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let stream = match self.supported_config.sample_format() {
            SampleFormat::F32 => {
                self.build_stream::<f32>(&config, samples, position, finished.clone())?
            }
            SampleFormat::I16 => {
                self.build_stream::<i16>(&config, samples, position, finished.clone())?
            }
            SampleFormat::U16 => {
                self.build_stream::<u16>(&config, samples, position, finished.clone())?
            }
            format => anyhow::bail!("unsupported sample format: {:?}", format),
        };

        stream.play().context("failed to start playback stream")?;

        Ok(AudioPlayback {
            _stream: stream,
            finished,
        })
    }

    fn build_stream<T>(
        &self,
        config: &StreamConfig,
        samples: Arc<Vec<f32>>,
        position: Arc<AtomicUsize>,
        finished: Arc<AtomicBool>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let silence = T::from_sample(0.0f32);
        let err_finished = finished.clone();
        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let pos = position.load(Ordering::SeqCst);
                    let remaining = samples.len().saturating_sub(pos);

                    if remaining == 0 {
                        data.fill(silence);
                        finished.store(true, Ordering::SeqCst);
                        return;
                    }

                    let to_copy = remaining.min(data.len());
                    for (out, &sample) in data.iter_mut().zip(&samples[pos..pos + to_copy]) {
                        *out = T::from_sample(sample);
                    }
                    data[to_copy..].fill(silence);

                    position.store(pos + to_copy, Ordering::SeqCst);
                },
                move |err| {
                    tracing::error!(error = ?err, "playback stream error");
                    err_finished.store(true, Ordering::SeqCst);
                },
                None,
            )
            .context("failed to build output stream")
    }
}

/// Interleaved f32 samples at the device's rate and channel count
fn prepare_samples(audio: &AudioData, native_rate: u32, native_channels: usize) -> Result<Vec<f32>> {
    let mono = i16_bytes_to_mono_f32(&audio.pcm_data, audio.channels.max(1) as usize);
    let resampled = if audio.sample_rate == native_rate {
        mono
    } else {
        resample(&mono, audio.sample_rate, native_rate)?
    };
    Ok(expand_to_channels(&resampled, native_channels.max(1)))
}

fn i16_bytes_to_mono_f32(bytes: &[u8], channels: usize) -> Vec<f32> {
    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();
    if channels == 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .context("failed to create resampler")?;

    let expected = samples.len() * target_rate as usize / source_rate as usize;
    let mut output = Vec::with_capacity(expected + RESAMPLE_CHUNK);
    let mut pos = 0;

    while pos < samples.len() {
        let frames_needed = resampler.input_frames_next();
        let end = (pos + frames_needed).min(samples.len());

        let mut chunk = samples[pos..end].to_vec();
        chunk.resize(frames_needed, 0.0);

        let resampled = resampler
            .process(&[chunk], None)
            .map_err(|e| anyhow::anyhow!("resampling failed: {e:?}"))?;
        if let Some(channel) = resampled.into_iter().next() {
            output.extend(channel);
        }
        pos = end;
    }

    // Zero padding of the final chunk would otherwise play as trailing silence
    output.truncate(expected.max(1).min(output.len()));
    Ok(output)
}

fn expand_to_channels(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .flat_map(|&sample| std::iter::repeat(sample).take(channels))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_same_rate_only_expands_channels() {
        let audio = AudioData {
            pcm_data: pcm(&[0, 16384, -16384]),
            sample_rate: 48000,
            channels: 1,
        };
        let samples = prepare_samples(&audio, 48000, 2).unwrap();
        assert_eq!(samples, vec![0.0, 0.0, 0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_upsampling_scales_length() {
        let audio = AudioData {
            pcm_data: pcm(&vec![1000; 16000]),
            sample_rate: 16000,
            channels: 1,
        };
        let samples = prepare_samples(&audio, 48000, 1).unwrap();
        assert_eq!(samples.len(), 48000);
    }

    #[test]
    fn test_stereo_source_is_downmixed() {
        let mono = i16_bytes_to_mono_f32(&pcm(&[16384, 0, -16384, -16384]), 2);
        assert_eq!(mono, vec![0.25, -0.5]);
    }
}
