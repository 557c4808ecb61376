use anyhow::{Context, Result};
use clap::Args;

use azkit_core::speech::{AzureSpeech, SpeechConfig, TextToSpeech};

#[derive(Args, Debug)]
pub struct VoicesArgs {
    /// Only show voices whose locale starts with this, e.g. en or en-GB
    #[arg(long)]
    locale: Option<String>,
}

pub async fn run(args: VoicesArgs) -> Result<()> {
    let config = SpeechConfig::from_env()
        .context("Set SPEECH_KEY and SPEECH_REGION to your Speech resource key and region")?;
    let speech = AzureSpeech::new(config)?;

    let mut voices = speech.list_voices().await?;
    if let Some(prefix) = &args.locale {
        let prefix = prefix.to_lowercase();
        voices.retain(|v| v.language_code.to_lowercase().starts_with(&prefix));
    }
    voices.sort_by(|a, b| a.id.cmp(&b.id));

    for voice in &voices {
        println!("{:<40} {:<8} {}", voice.id, voice.language_code, voice.name);
    }
    println!("{} voices", voices.len());
    Ok(())
}
