//! Azure Speech text-to-speech over the REST endpoint

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::Client;
use serde::Deserialize;

use super::config::SpeechConfig;
use super::provider::TextToSpeech;
use super::types::{
    AudioData, CancellationDetails, CancellationErrorCode, CancellationReason, SynthesisResult,
    Voice,
};

const USER_AGENT: &str = concat!("azkit/", env!("CARGO_PKG_VERSION"));

pub struct AzureSpeech {
    config: SpeechConfig,
    client: Client,
}

impl AzureSpeech {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VoiceData {
    short_name: String,
    display_name: String,
    locale: String,
}

#[async_trait]
impl TextToSpeech for AzureSpeech {
    fn default_voice(&self) -> Voice {
        self.config.voice()
    }

    async fn synthesize(&self, text: &str, voice: Option<&Voice>) -> Result<SynthesisResult> {
        let default_voice = self.default_voice();
        let voice = voice.unwrap_or(&default_voice);
        let format = self.config.output_format();

        tracing::debug!(voice = %voice.id, %format, bytes = text.len(), "synthesizing speech");

        let response = self
            .client
            .post(self.config.synthesis_url())
            .header("Ocp-Apim-Subscription-Key", self.config.subscription_key())
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", format.to_string())
            .body(build_ssml(text, voice))
            .send()
            .await
            .context("Failed to send request to Azure Speech")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(?status, %body, "speech synthesis rejected");
            let error_details = if body.trim().is_empty() {
                status.to_string()
            } else {
                format!("{status}: {}", body.trim())
            };
            return Ok(SynthesisResult::Canceled(CancellationDetails {
                reason: CancellationReason::Error,
                error_code: Some(CancellationErrorCode::from_status(status)),
                error_details,
            }));
        }

        let pcm_data = response
            .bytes()
            .await
            .context("Failed to read audio bytes")?
            .to_vec();

        if pcm_data.is_empty() {
            return Ok(SynthesisResult::Canceled(CancellationDetails {
                reason: CancellationReason::EndOfStream,
                error_code: None,
                error_details: String::new(),
            }));
        }

        Ok(SynthesisResult::Completed(AudioData {
            pcm_data,
            sample_rate: format.sample_rate(),
            channels: 1,
        }))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        let response = self
            .client
            .get(self.config.voices_url())
            .header("Ocp-Apim-Subscription-Key", self.config.subscription_key())
            .send()
            .await
            .context("Failed to list voices from Azure Speech")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Azure Speech API error {status}: {body}");
        }

        let voices: Vec<VoiceData> = response
            .json()
            .await
            .context("Failed to parse voices response")?;

        Ok(voices
            .into_iter()
            .map(|v| Voice {
                id: v.short_name,
                name: v.display_name,
                language_code: v.locale,
            })
            .collect())
    }
}

pub(crate) fn build_ssml(text: &str, voice: &Voice) -> String {
    format!(
        "<speak version='1.0' xml:lang='{lang}' xmlns='http://www.w3.org/2001/10/synthesis'>\
         <voice name='{name}'>{text}</voice></speak>",
        lang = escape(&voice.language_code),
        name = escape(&voice.id),
        text = escape(text),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssml_wraps_text_in_voice() {
        let voice = Voice::from_short_name("en-US-AndrewNeural");
        assert_eq!(
            build_ssml("Hello world", &voice),
            "<speak version='1.0' xml:lang='en-US' xmlns='http://www.w3.org/2001/10/synthesis'>\
             <voice name='en-US-AndrewNeural'>Hello world</voice></speak>"
        );
    }

    #[test]
    fn test_ssml_escapes_voice_attributes() {
        let voice = Voice {
            id: "en-US-<Custom>'Voice".to_string(),
            name: "Custom".to_string(),
            language_code: "en-US".to_string(),
        };
        let ssml = build_ssml("hi", &voice);
        assert!(ssml.contains("<voice name='en-US-&lt;Custom&gt;&apos;Voice'>hi</voice>"));
    }

    #[test]
    fn test_ssml_escapes_markup() {
        let voice = Voice::from_short_name("en-US-AvaNeural");
        let ssml = build_ssml("1 < 2 & \"quotes\" aren't <break/>", &voice);
        assert!(ssml.contains(
            "1 &lt; 2 &amp; &quot;quotes&quot; aren&apos;t &lt;break/&gt;</voice>"
        ));
    }
}
