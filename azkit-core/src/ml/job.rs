use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::ValidationError;

/// Description of one command job. Built with [`command`], submitted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandJob {
    /// Local directory or `azureml:name:version` / ARM id of a code asset
    pub code: String,
    /// Command line run inside the job container
    pub command: String,
    /// `name@latest`, `name:version`, `azureml:...` or an ARM id
    pub environment: String,
    /// Compute target name or ARM id
    pub compute: String,
    pub experiment_name: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub environment_variables: BTreeMap<String, String>,
}

impl CommandJob {
    /// Every field the service needs to schedule the job must be non-empty
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require("code", &self.code)?;
        ValidationError::require("command", &self.command)?;
        ValidationError::require("environment", &self.environment)?;
        ValidationError::require("compute", &self.compute)?;
        ValidationError::require("experiment_name", &self.experiment_name)?;
        if let Some(name) = &self.name {
            ValidationError::require("name", name)?;
        }
        Ok(())
    }

    /// Explicit name if one was set, otherwise a fresh random one
    pub fn job_name(&self) -> String {
        self.name.clone().unwrap_or_else(generate_job_name)
    }
}

fn generate_job_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("azkit_{}", &id[..12])
}

/// Start describing a command job.
///
/// ```
/// let job = azkit_core::command()
///     .code("./src")
///     .command("python train.py")
///     .environment("AzureML-sklearn-0.24-ubuntu18.04-py37-cpu@latest")
///     .compute("aml-cluster")
///     .experiment_name("train-model")
///     .build()
///     .unwrap();
/// assert_eq!(job.compute, "aml-cluster");
/// ```
pub fn command() -> JobBuilder {
    JobBuilder::default()
}

#[derive(Debug, Clone, Default)]
pub struct JobBuilder {
    code: String,
    command: String,
    environment: String,
    compute: String,
    experiment_name: String,
    name: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    tags: BTreeMap<String, String>,
    environment_variables: BTreeMap<String, String>,
}

impl JobBuilder {
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn compute(mut self, compute: impl Into<String>) -> Self {
        self.compute = compute.into();
        self
    }

    pub fn experiment_name(mut self, experiment_name: impl Into<String>) -> Self {
        self.experiment_name = experiment_name.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn environment_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<CommandJob, ValidationError> {
        let job = CommandJob {
            code: self.code,
            command: self.command,
            environment: self.environment,
            compute: self.compute,
            experiment_name: self.experiment_name,
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            tags: self.tags,
            environment_variables: self.environment_variables,
        };
        job.validate()?;
        Ok(job)
    }
}
