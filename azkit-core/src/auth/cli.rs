//! Credential backed by the Azure CLI's logged-in account

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;

use super::{scope_to_resource, AccessToken, TokenCache, TokenCredential};

pub struct AzureCliCredential {
    program: String,
    cache: TokenCache,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Local time, e.g. `2024-05-01 13:37:00.000000`
    expires_on: Option<String>,
    /// Unix seconds; only emitted by newer CLI versions
    #[serde(rename = "expires_on")]
    expires_on_unix: Option<i64>,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
            cache: TokenCache::default(),
        }
    }

    /// Use a different executable instead of `az` on the PATH
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let resource = scope_to_resource(scope);
        tracing::debug!(program = %self.program, resource, "requesting token from azure cli");

        let output = Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| {
                format!(
                    "Failed to execute {} - ensure the Azure CLI is installed",
                    self.program
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "az account get-access-token failed with exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        parse_cli_token(&output.stdout)
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken> {
    let token: CliToken =
        serde_json::from_slice(stdout).context("Failed to parse token JSON from az CLI")?;

    let expires_on = match (token.expires_on_unix, token.expires_on.as_deref()) {
        (Some(secs), _) => DateTime::<Utc>::from_timestamp(secs, 0)
            .context("az CLI returned an out of range expires_on")?,
        (None, Some(local)) => parse_local_timestamp(local)?,
        (None, None) => bail!("az CLI token has no expiry"),
    };

    Ok(AccessToken {
        token: token.access_token,
        expires_on,
    })
}

fn parse_local_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .with_context(|| format!("Unrecognised expiresOn value: {value}"))?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("expiresOn does not exist in the local timezone: {value}"))?;
    Ok(local.with_timezone(&Utc))
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "AzureCliCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.cache
            .get_or_fetch(scope, || self.request_token(scope))
            .await
    }
}
