use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::code::CodeSnapshot;
use super::job::CommandJob;
use super::types::*;
use super::WorkspaceScope;
use crate::auth::{TokenCredential, MANAGEMENT_SCOPE};
use crate::error::ServiceError;

pub const API_VERSION: &str = "2023-10-01";
const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
const ARM_PREFIX: &str = "/subscriptions/";
const ASSET_PREFIX: &str = "azureml:";
const REGISTRY_PREFIX: &str = "azureml://";
/// Version given to anonymous code assets; the name already identifies content
const CODE_VERSION: &str = "1";

/// What the service reported back for a submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub name: String,
    pub id: Option<String>,
    pub status: Option<String>,
    pub experiment_name: Option<String>,
    pub studio_url: Option<String>,
}

/// Client for one Azure ML workspace
pub struct MlClient {
    credential: Arc<dyn TokenCredential>,
    scope: WorkspaceScope,
    client: Client,
    endpoint: String,
}

impl MlClient {
    pub fn new(credential: Arc<dyn TokenCredential>, scope: WorkspaceScope) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            credential,
            scope,
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Send management calls somewhere other than the public cloud endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn scope(&self) -> &WorkspaceScope {
        &self.scope
    }

    /// Resolve the job's references and create it in the workspace.
    pub async fn create_or_update(&self, job: &CommandJob) -> Result<SubmittedJob> {
        job.validate()?;

        let code_id = self.resolve_code(&job.code).await?;
        let environment_id = self.resolve_environment(&job.environment).await?;
        let compute_id = self.resolve_compute(&job.compute);
        let name = job.job_name();

        info!(
            job = %name,
            experiment = %job.experiment_name,
            %code_id,
            %environment_id,
            %compute_id,
            "submitting command job"
        );

        let body = Resource::new(CommandJobProperties {
            job_type: "Command",
            command: job.command.clone(),
            code_id,
            environment_id,
            compute_id,
            experiment_name: job.experiment_name.clone(),
            display_name: job.display_name.clone(),
            description: job.description.clone(),
            tags: job.tags.clone(),
            environment_variables: job.environment_variables.clone(),
        });

        let url = self.workspace_url(&format!("/jobs/{name}"));
        let response: Resource<JobResponseProperties> =
            self.send_json("create job", Method::PUT, &url, Some(&body)).await?;

        let studio_url = response
            .properties
            .services
            .as_ref()
            .and_then(|services| services.get("Studio"))
            .and_then(|s| s.endpoint.clone());

        info!(job = %name, status = ?response.properties.status, "job submitted");

        Ok(SubmittedJob {
            name: response.name.unwrap_or(name),
            id: response.id,
            status: response.properties.status,
            experiment_name: response.properties.experiment_name,
            studio_url,
        })
    }

    /// ARM id of the code asset, uploading a local directory when needed
    pub async fn resolve_code(&self, code: &str) -> Result<String> {
        if code.starts_with(ARM_PREFIX) {
            return Ok(code.to_string());
        }
        if let Some(asset) = code.strip_prefix(ASSET_PREFIX) {
            let Some((name, version)) = asset.split_once(':') else {
                bail!("code asset reference {code} must be azureml:<name>:<version>");
            };
            return Ok(self.scope.asset_id("codes", name, version));
        }

        let snapshot = CodeSnapshot::collect(Path::new(code))?;
        self.ensure_code_asset(&snapshot).await
    }

    async fn ensure_code_asset(&self, snapshot: &CodeSnapshot) -> Result<String> {
        let asset_id = self
            .scope
            .asset_id("codes", &snapshot.hash, CODE_VERSION);
        let version_url = self.workspace_url(&format!(
            "/codes/{}/versions/{CODE_VERSION}",
            snapshot.hash
        ));

        match self
            .send_json::<Resource<CodeVersionProperties>, ()>(
                "get code version",
                Method::GET,
                &version_url,
                None,
            )
            .await
        {
            Ok(_) => {
                debug!(hash = %snapshot.hash, "code asset already registered");
                return Ok(asset_id);
            }
            Err(e) if is_not_found(&e) => {}
            Err(e) => return Err(e),
        }

        let upload_url = self.workspace_url(&format!(
            "/codes/{}/versions/{CODE_VERSION}/startPendingUpload",
            snapshot.hash
        ));
        let pending: PendingUploadResponse = self
            .send_json(
                "start code upload",
                Method::POST,
                &upload_url,
                Some(&PendingUploadRequest {
                    pending_upload_type: "TemporaryBlobReference",
                }),
            )
            .await?;

        let reference = pending.blob_reference_for_consumption;
        snapshot
            .upload(&self.client, &reference.credential.sas_uri)
            .await?;

        let body = Resource::new(CodeVersionProperties {
            code_uri: Some(reference.blob_uri),
            is_anonymous: Some(true),
        });
        let _: Resource<CodeVersionProperties> = self
            .send_json("register code version", Method::PUT, &version_url, Some(&body))
            .await?;

        info!(hash = %snapshot.hash, root = ?snapshot.root, "registered code asset");
        Ok(asset_id)
    }

    /// ARM id (or registry URI) of the environment version to run in
    pub async fn resolve_environment(&self, environment: &str) -> Result<String> {
        if environment.starts_with(ARM_PREFIX) || environment.starts_with(REGISTRY_PREFIX) {
            return Ok(environment.to_string());
        }
        let reference = environment
            .strip_prefix(ASSET_PREFIX)
            .unwrap_or(environment);

        if let Some((name, label)) = reference.split_once('@') {
            if label != "latest" {
                bail!("unsupported environment label '{label}', only @latest is supported");
            }
            let url = self.workspace_url(&format!("/environments/{name}"));
            let container: Resource<EnvironmentContainerProperties> = self
                .send_json::<_, ()>("get environment", Method::GET, &url, None)
                .await?;
            let version = container
                .properties
                .latest_version
                .with_context(|| format!("environment {name} has no versions"))?;
            debug!(%name, %version, "resolved latest environment version");
            return Ok(self.scope.asset_id("environments", name, &version));
        }

        if let Some((name, version)) = reference.split_once(':') {
            return Ok(self.scope.asset_id("environments", name, version));
        }

        bail!("environment '{environment}' must be <name>:<version> or <name>@latest")
    }

    pub fn resolve_compute(&self, compute: &str) -> String {
        if compute.starts_with(ARM_PREFIX) {
            return compute.to_string();
        }
        let name = compute.strip_prefix(ASSET_PREFIX).unwrap_or(compute);
        format!("{}/computes/{name}", self.scope.workspace_id())
    }

    fn workspace_url(&self, path: &str) -> String {
        format!(
            "{}{}{path}?api-version={API_VERSION}",
            self.endpoint,
            self.scope.workspace_id()
        )
    }

    async fn authorized(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;
        Ok(self.client.request(method, url).bearer_auth(token.token))
    }

    async fn send_json<T, B>(
        &self,
        operation: &'static str,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(operation, %method, %url, "azure ml request");
        let mut request = self.authorized(method, url).await?;
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{operation}: request to {url} failed"))?;
        let response = ServiceError::check(operation, response).await?;

        response
            .json()
            .await
            .with_context(|| format!("{operation}: failed to parse response"))
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ServiceError>()
        .is_some_and(ServiceError::is_not_found)
}
