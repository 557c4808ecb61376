use crate::error::ValidationError;

use super::types::{OutputFormat, Voice};

pub const SPEECH_KEY_VAR: &str = "SPEECH_KEY";
pub const SPEECH_REGION_VAR: &str = "SPEECH_REGION";

pub const DEFAULT_VOICE: &str = "en-US-AndrewNeural";

/// Credential, region and voice for a speech session
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    subscription_key: String,
    region: String,
    /// Base URL replacing `https://{region}.tts.speech.microsoft.com`
    endpoint: Option<String>,
    voice_name: String,
    output_format: OutputFormat,
}

impl SpeechConfig {
    pub fn from_subscription(
        subscription_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let subscription_key = subscription_key.into();
        let region = region.into();
        ValidationError::require(SPEECH_KEY_VAR, &subscription_key)?;
        ValidationError::require(SPEECH_REGION_VAR, &region)?;

        Ok(Self {
            subscription_key,
            region,
            endpoint: None,
            voice_name: DEFAULT_VOICE.to_string(),
            output_format: OutputFormat::default(),
        })
    }

    /// Read `SPEECH_KEY` and `SPEECH_REGION`
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_subscription(
            lookup(SPEECH_KEY_VAR).unwrap_or_default(),
            lookup(SPEECH_REGION_VAR).unwrap_or_default(),
        )
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_voice(mut self, voice_name: impl Into<String>) -> Self {
        self.voice_name = voice_name.into();
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn subscription_key(&self) -> &str {
        &self.subscription_key
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn voice(&self) -> Voice {
        Voice::from_short_name(&self.voice_name)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.tts.speech.microsoft.com", self.region),
        }
    }

    pub fn synthesis_url(&self) -> String {
        format!("{}/cognitiveservices/v1", self.base_url())
    }

    pub fn voices_url(&self) -> String {
        format!("{}/cognitiveservices/voices/list", self.base_url())
    }
}
