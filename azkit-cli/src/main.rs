use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use azkit_core::settings::manager::SettingsManager;

mod progress;
mod speak;
mod submit_job;
mod voices;

#[derive(Parser, Debug)]
#[command(name = "azkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Submit Azure ML training jobs and speak text with Azure Speech")]
struct Args {
    /// Settings file to use instead of ~/.azkit/settings.toml
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a command job to the configured Azure ML workspace
    SubmitJob(submit_job::SubmitJobArgs),
    /// Read a line of text and play it with Azure Speech
    Speak(speak::SpeakArgs),
    /// List the voices available in SPEECH_REGION
    Voices(voices::VoicesArgs),
}

fn main() -> Result<()> {
    setup_tracing()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = Args::parse();
    info!(command = ?args.command, settings = ?args.settings, "CLI startup");

    let settings_manager = match args.settings {
        Some(path) => SettingsManager::from_path(path)?,
        None => SettingsManager::new()?,
    };
    info!(path = ?settings_manager.path(), "settings loaded");
    let settings = settings_manager.effective_settings();

    match args.command {
        Command::SubmitJob(cmd) => submit_job::run(cmd, &settings).await,
        Command::Speak(cmd) => speak::run(cmd, &settings).await,
        Command::Voices(cmd) => voices::run(cmd).await,
    }
}

fn setup_tracing() -> Result<()> {
    use std::fs;
    use tracing_subscriber::fmt;

    let trace_dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".azkit")
        .join("trace");
    fs::create_dir_all(&trace_dir)?;

    let log_file = trace_dir.join("azkit.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();

    info!("Tracing initialized to {:?}", log_file);
    Ok(())
}
