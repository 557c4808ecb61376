use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Audio data returned from TTS synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    /// Signed 16-bit little-endian samples
    pub pcm_data: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioData {
    pub fn duration_ms(&self) -> u64 {
        let frame_bytes = 2 * self.channels.max(1) as u64;
        let frames = self.pcm_data.len() as u64 / frame_bytes;
        frames * 1000 / self.sample_rate.max(1) as u64
    }
}

/// Voice configuration for TTS
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voice {
    /// Short name passed to the service, e.g. `en-US-AndrewNeural`
    pub id: String,
    pub name: String,
    pub language_code: String,
}

impl Voice {
    /// Voice known only by its short name; the locale is its first two parts
    pub fn from_short_name(short_name: &str) -> Self {
        let language_code = short_name
            .splitn(3, '-')
            .take(2)
            .collect::<Vec<_>>()
            .join("-");
        Self {
            id: short_name.to_string(),
            name: short_name.to_string(),
            language_code,
        }
    }
}

/// Raw PCM formats the synthesis endpoint can return
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "raw-16khz-16bit-mono-pcm")]
    #[strum(serialize = "raw-16khz-16bit-mono-pcm")]
    Raw16Khz16BitMonoPcm,
    #[serde(rename = "raw-24khz-16bit-mono-pcm")]
    #[strum(serialize = "raw-24khz-16bit-mono-pcm")]
    Raw24Khz16BitMonoPcm,
    #[serde(rename = "raw-48khz-16bit-mono-pcm")]
    #[strum(serialize = "raw-48khz-16bit-mono-pcm")]
    Raw48Khz16BitMonoPcm,
}

impl OutputFormat {
    pub fn sample_rate(&self) -> u32 {
        match self {
            OutputFormat::Raw16Khz16BitMonoPcm => 16000,
            OutputFormat::Raw24Khz16BitMonoPcm => 24000,
            OutputFormat::Raw48Khz16BitMonoPcm => 48000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CancellationReason {
    /// The service rejected or failed the request
    Error,
    /// Service accepted the request but produced no audio
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CancellationErrorCode {
    BadRequest,
    AuthenticationFailure,
    Forbidden,
    TooManyRequests,
    ServiceTimeout,
    ServiceError,
    ServiceUnavailable,
    RuntimeError,
}

impl CancellationErrorCode {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest,
            401 => Self::AuthenticationFailure,
            403 => Self::Forbidden,
            408 | 504 => Self::ServiceTimeout,
            429 => Self::TooManyRequests,
            503 => Self::ServiceUnavailable,
            500..=599 => Self::ServiceError,
            _ => Self::RuntimeError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDetails {
    pub reason: CancellationReason,
    pub error_code: Option<CancellationErrorCode>,
    pub error_details: String,
}

/// Outcome of one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisResult {
    Completed(AudioData),
    Canceled(CancellationDetails),
}

impl SynthesisResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, SynthesisResult::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[test]
    fn test_voice_locale_from_short_name() {
        let voice = Voice::from_short_name("en-US-AndrewNeural");
        assert_eq!(voice.language_code, "en-US");
        assert_eq!(voice.id, "en-US-AndrewNeural");

        let voice = Voice::from_short_name("zh-CN-henan-YundengNeural");
        assert_eq!(voice.language_code, "zh-CN");
    }

    #[test]
    fn test_output_format_header_value() {
        assert_eq!(
            OutputFormat::default().to_string(),
            "raw-16khz-16bit-mono-pcm"
        );
        assert_eq!(
            OutputFormat::from_str("raw-24khz-16bit-mono-pcm").unwrap(),
            OutputFormat::Raw24Khz16BitMonoPcm
        );
        assert_eq!(OutputFormat::Raw48Khz16BitMonoPcm.sample_rate(), 48000);
    }

    #[rstest]
    #[case(400, CancellationErrorCode::BadRequest)]
    #[case(401, CancellationErrorCode::AuthenticationFailure)]
    #[case(429, CancellationErrorCode::TooManyRequests)]
    #[case(502, CancellationErrorCode::ServiceError)]
    #[case(503, CancellationErrorCode::ServiceUnavailable)]
    #[case(504, CancellationErrorCode::ServiceTimeout)]
    #[case(415, CancellationErrorCode::RuntimeError)]
    fn test_error_code_from_status(#[case] status: u16, #[case] expected: CancellationErrorCode) {
        let status = reqwest::StatusCode::from_u16(status).unwrap();
        assert_eq!(CancellationErrorCode::from_status(status), expected);
    }

    #[test]
    fn test_duration_of_one_second_mono() {
        let audio = AudioData {
            pcm_data: vec![0; 32000],
            sample_rate: 16000,
            channels: 1,
        };
        assert_eq!(audio.duration_ms(), 1000);
    }
}
