use anyhow::Result;
use async_trait::async_trait;

use super::{
    AccessToken, AzureCliCredential, ClientSecretCredential, CredentialError, TokenCredential,
};

/// Tries each credential in order and returns the first token obtained.
pub struct DefaultCredential {
    sources: Vec<Box<dyn TokenCredential>>,
}

impl DefaultCredential {
    /// Environment service principal (when configured), then the Azure CLI
    pub fn new() -> Result<Self> {
        let mut sources: Vec<Box<dyn TokenCredential>> = Vec::new();
        if let Some(env) = ClientSecretCredential::from_env()? {
            sources.push(Box::new(env));
        }
        sources.push(Box::new(AzureCliCredential::new()));
        Ok(Self { sources })
    }

    pub fn from_sources(sources: Vec<Box<dyn TokenCredential>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    fn name(&self) -> &'static str {
        "DefaultCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut attempts = Vec::new();

        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(source = source.name(), "obtained token");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(source = source.name(), error = ?e, "credential unavailable");
                    attempts.push(format!("- {}: {e:#}", source.name()));
                }
            }
        }

        Err(CredentialError { attempts }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    struct Failing;

    #[async_trait]
    impl TokenCredential for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
            anyhow::bail!("not logged in")
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl TokenCredential for Fixed {
        fn name(&self) -> &'static str {
            "Fixed"
        }

        async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
            Ok(AccessToken {
                token: self.0.to_string(),
                expires_on: Utc::now() + Duration::hours(1),
            })
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_next_source() {
        let chain = DefaultCredential::from_sources(vec![
            Box::new(Failing),
            Box::new(Fixed("second")),
        ]);
        let token = chain.get_token("scope").await.unwrap();
        assert_eq!(token.token, "second");
    }

    #[tokio::test]
    async fn test_reports_every_attempt() {
        let chain = DefaultCredential::from_sources(vec![Box::new(Failing), Box::new(Failing)]);
        let err = chain.get_token("scope").await.unwrap_err();

        let credential_err = err.downcast_ref::<CredentialError>().unwrap();
        assert_eq!(credential_err.attempts.len(), 2);
        assert!(err.to_string().contains("Failing: not logged in"));
    }
}
