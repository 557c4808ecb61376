//! Service principal credential configured through environment variables

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::{AccessToken, TokenCache, TokenCredential};
use crate::error::ServiceError;

pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    client: Client,
    cache: TokenCache,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl ClientSecretCredential {
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            authority: DEFAULT_AUTHORITY.to_string(),
            client,
            cache: TokenCache::default(),
        })
    }

    /// Returns `None` unless all three variables are set and non-empty
    pub fn from_env() -> Result<Option<Self>> {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        match (
            read(TENANT_ID_VAR),
            read(CLIENT_ID_VAR),
            read(CLIENT_SECRET_VAR),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                Ok(Some(Self::new(tenant_id, client_id, client_secret)?))
            }
            _ => Ok(None),
        }
    }

    /// Point at a different identity endpoint (sovereign clouds, tests)
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    async fn request_token(&self, scope: &str) -> Result<AccessToken> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        tracing::debug!(%url, client_id = %self.client_id, "requesting client credentials token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope),
            ])
            .send()
            .await
            .context("Failed to reach the identity endpoint")?;

        let response = ServiceError::check("token request", response).await?;
        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        Ok(AccessToken {
            token: body.access_token,
            expires_on: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "EnvironmentCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.cache
            .get_or_fetch(scope, || self.request_token(scope))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MANAGEMENT_SCOPE;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential(server: &MockServer) -> ClientSecretCredential {
        ClientSecretCredential::new(
            "tenant-1".to_string(),
            "client-1".to_string(),
            "s3cret".to_string(),
        )
        .unwrap()
        .with_authority(server.uri())
    }

    #[tokio::test]
    async fn test_fetches_and_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=client-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "token-abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = credential(&server);
        let first = credential.get_token(MANAGEMENT_SCOPE).await.unwrap();
        let second = credential.get_token(MANAGEMENT_SCOPE).await.unwrap();

        assert_eq!(first.token, "token-abc");
        assert_eq!(second.token, "token-abc");
        assert!(first.expires_on > Utc::now());
    }

    #[tokio::test]
    async fn test_rejected_secret_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("AADSTS7000215: invalid secret"))
            .mount(&server)
            .await;

        let err = credential(&server)
            .get_token(MANAGEMENT_SCOPE)
            .await
            .unwrap_err();

        let service = err.downcast_ref::<ServiceError>().unwrap();
        assert_eq!(service.status.as_u16(), 401);
        assert!(service.body.contains("AADSTS7000215"));
    }
}
