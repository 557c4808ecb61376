use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValidationError;
use crate::ml::WorkspaceScope;
use crate::speech::{OutputFormat, DEFAULT_VOICE};

pub const SUBSCRIPTION_ID_VAR: &str = "AZURE_SUBSCRIPTION_ID";
pub const RESOURCE_GROUP_VAR: &str = "AZURE_RESOURCE_GROUP";
pub const WORKSPACE_NAME_VAR: &str = "AZUREML_WORKSPACE_NAME";

/// Which Azure ML workspace jobs are submitted to
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub subscription_id: String,

    #[serde(default)]
    pub resource_group: String,

    #[serde(default)]
    pub workspace_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechSettings {
    /// Neural voice used when `--voice` is not given
    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            output_format: OutputFormat::default(),
        }
    }
}

/// Values used for any job field not given on the command line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobDefaults {
    #[serde(default = "default_code")]
    pub code: String,

    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_compute")]
    pub compute: String,

    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,

    /// Extra environment variables set inside the job container
    #[serde(default)]
    pub environment_variables: HashMap<String, String>,
}

fn default_code() -> String {
    "./src".to_string()
}

fn default_command() -> String {
    "python train.py".to_string()
}

fn default_environment() -> String {
    "AzureML-sklearn-0.24-ubuntu18.04-py37-cpu@latest".to_string()
}

fn default_compute() -> String {
    "aml-cluster".to_string()
}

fn default_experiment_name() -> String {
    "train-model".to_string()
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            code: default_code(),
            command: default_command(),
            environment: default_environment(),
            compute: default_compute(),
            experiment_name: default_experiment_name(),
            environment_variables: HashMap::new(),
        }
    }
}

/// Core application settings, persisted as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub workspace: WorkspaceSettings,

    #[serde(default)]
    pub speech: SpeechSettings,

    #[serde(default)]
    pub job: JobDefaults,
}

impl Settings {
    /// Overlay workspace identifiers from the environment onto the file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets = [
            (SUBSCRIPTION_ID_VAR, &mut self.workspace.subscription_id),
            (RESOURCE_GROUP_VAR, &mut self.workspace.resource_group),
            (WORKSPACE_NAME_VAR, &mut self.workspace.workspace_name),
        ];

        for (var, field) in targets {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(var, "workspace setting overridden from environment");
                *field = value;
            }
        }
    }

    pub fn workspace_scope(&self) -> Result<WorkspaceScope, ValidationError> {
        WorkspaceScope::new(
            self.workspace.subscription_id.clone(),
            self.workspace.resource_group.clone(),
            self.workspace.workspace_name.clone(),
        )
    }
}
