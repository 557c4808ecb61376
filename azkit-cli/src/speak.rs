use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, warn};

use azkit_core::audio::AudioOutput;
use azkit_core::settings::Settings;
use azkit_core::speech::{describe, AzureSpeech, OutputFormat, SpeechConfig, SpeechSynthesizer};

use crate::progress::spinner;

const PROMPT: &str = "Enter some text that you want to speak >";

#[derive(Args, Debug)]
pub struct SpeakArgs {
    /// Text to speak; read from standard input when omitted
    #[arg(long)]
    text: Option<String>,

    /// Voice short name, e.g. en-US-AvaNeural
    #[arg(long)]
    voice: Option<String>,

    /// Write the audio to a WAV file instead of the speaker
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Synthesize without playing or saving the audio
    #[arg(long, conflicts_with = "output")]
    no_play: bool,

    /// Raw PCM format requested from the service
    #[arg(long)]
    format: Option<OutputFormat>,
}

pub async fn run(args: SpeakArgs, settings: &Settings) -> Result<()> {
    let config = SpeechConfig::from_env()
        .context("Set SPEECH_KEY and SPEECH_REGION to your Speech resource key and region")?
        .with_voice(args.voice.unwrap_or_else(|| settings.speech.voice.clone()))
        .with_output_format(args.format.unwrap_or(settings.speech.output_format));

    let output = choose_output(args.output, args.no_play);

    let text = match args.text {
        Some(text) => text,
        None => read_text()?,
    };

    let synthesizer = SpeechSynthesizer::new(Box::new(AzureSpeech::new(config)?), output);

    let progress = spinner("Synthesizing speech");
    let result = synthesizer.speak_text(&text).await;
    progress.finish_and_clear();
    let result = result?;

    info!(completed = result.is_completed(), "speak finished");

    for line in describe(&text, &result) {
        println!("{line}");
    }
    Ok(())
}

fn choose_output(path: Option<PathBuf>, no_play: bool) -> AudioOutput {
    if let Some(path) = path {
        return AudioOutput::WavFile(path);
    }
    if no_play {
        return AudioOutput::Discard;
    }
    if cfg!(feature = "audio") {
        AudioOutput::Speaker
    } else {
        warn!("built without the audio feature, synthesized audio will not be played");
        eprintln!("(built without speaker support; pass --output <PATH> to keep the audio)");
        AudioOutput::Discard
    }
}

fn read_text() -> Result<String> {
    println!("{PROMPT}");
    let mut rl = DefaultEditor::new()?;
    match rl.readline("") {
        Ok(line) => Ok(line),
        Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
            anyhow::bail!("no text entered")
        }
        Err(e) => Err(e).context("Failed to read text from standard input"),
    }
}
