//! Text-to-speech through Azure Speech

pub mod azure;
pub mod config;
pub mod provider;
pub mod report;
pub mod synthesizer;
pub mod types;

pub use azure::AzureSpeech;
pub use config::{SpeechConfig, DEFAULT_VOICE};
pub use provider::TextToSpeech;
pub use report::describe;
pub use synthesizer::SpeechSynthesizer;
pub use types::{
    AudioData, CancellationDetails, CancellationErrorCode, CancellationReason, OutputFormat,
    SynthesisResult, Voice,
};
