use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use azkit_core::auth::DefaultCredential;
use azkit_core::ml::{command, CommandJob, MlClient};
use azkit_core::settings::Settings;

use crate::progress::spinner;

#[derive(Args, Debug)]
pub struct SubmitJobArgs {
    /// Local code directory or azureml:<name>:<version>
    #[arg(long)]
    code: Option<String>,

    /// Command line run inside the job
    #[arg(long)]
    command: Option<String>,

    /// Environment, e.g. <name>@latest or <name>:<version>
    #[arg(long)]
    environment: Option<String>,

    /// Compute target name
    #[arg(long)]
    compute: Option<String>,

    #[arg(long)]
    experiment_name: Option<String>,

    /// Job name; a random one is generated when omitted
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    display_name: Option<String>,

    /// Tags as KEY=VALUE, may be repeated
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    tags: Vec<(String, String)>,
}

pub async fn run(args: SubmitJobArgs, settings: &Settings) -> Result<()> {
    let scope = settings
        .workspace_scope()
        .context("Workspace is not configured; set it in the settings file or AZURE_SUBSCRIPTION_ID / AZURE_RESOURCE_GROUP / AZUREML_WORKSPACE_NAME")?;
    let job = build_job(args, settings)?;

    let credential = Arc::new(DefaultCredential::new()?);
    let ml_client = MlClient::new(credential, scope)?;

    let progress = spinner(&format!(
        "Submitting job to workspace {}",
        ml_client.scope().workspace_name()
    ));
    let submitted = ml_client.create_or_update(&job).await;
    progress.finish_and_clear();
    let submitted = submitted?;

    info!(job = %submitted.name, "submit-job finished");

    println!("Submitted job {}", submitted.name);
    if let Some(status) = &submitted.status {
        println!("Status: {status}");
    }
    if let Some(url) = &submitted.studio_url {
        println!("Studio: {url}");
    }
    Ok(())
}

fn build_job(args: SubmitJobArgs, settings: &Settings) -> Result<CommandJob> {
    let defaults = &settings.job;

    let mut builder = command()
        .code(args.code.unwrap_or_else(|| defaults.code.clone()))
        .command(args.command.unwrap_or_else(|| defaults.command.clone()))
        .environment(
            args.environment
                .unwrap_or_else(|| defaults.environment.clone()),
        )
        .compute(args.compute.unwrap_or_else(|| defaults.compute.clone()))
        .experiment_name(
            args.experiment_name
                .unwrap_or_else(|| defaults.experiment_name.clone()),
        );

    if let Some(name) = args.name {
        builder = builder.name(name);
    }
    if let Some(display_name) = args.display_name {
        builder = builder.display_name(display_name);
    }
    for (key, value) in &defaults.environment_variables {
        builder = builder.environment_variable(key, value);
    }
    for (key, value) in args.tags {
        builder = builder.tag(key, value);
    }

    Ok(builder.build()?)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
