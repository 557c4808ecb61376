//! Bearer tokens for Azure Resource Manager
//!
//! Mirrors the managed SDK's default credential: a service principal from the
//! environment when one is configured, otherwise whatever `az login` holds.

pub mod chain;
pub mod cli;
pub mod env;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

pub use chain::DefaultCredential;
pub use cli::AzureCliCredential;
pub use env::ClientSecretCredential;

/// Scope used for every management-plane call
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Tokens are refreshed this long before they actually expire
const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expiring(&self, now: DateTime<Utc>) -> bool {
        self.expires_on - Duration::seconds(EXPIRY_MARGIN_SECS) <= now
    }
}

/// Source of bearer tokens for a scope such as [`MANAGEMENT_SCOPE`]
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and in [`CredentialError`]
    fn name(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

#[derive(Error, Debug)]
#[error("no credential source could provide a token:\n{}", .attempts.join("\n"))]
pub struct CredentialError {
    pub attempts: Vec<String>,
}

/// Per-scope token cache shared by the credential implementations
#[derive(Default)]
pub(crate) struct TokenCache {
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl TokenCache {
    pub(crate) async fn get_or_fetch<F, Fut>(&self, scope: &str, fetch: F) -> Result<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<AccessToken>>,
    {
        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens.get(scope) {
            if !token.is_expiring(Utc::now()) {
                return Ok(token.clone());
            }
            tracing::debug!(scope, "cached token is expiring, refreshing");
        }

        let token = fetch().await?;
        tokens.insert(scope.to_string(), token.clone());
        Ok(token)
    }
}

/// `https://management.azure.com/.default` -> `https://management.azure.com`
pub(crate) fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_scope_to_resource() {
        assert_eq!(
            scope_to_resource(MANAGEMENT_SCOPE),
            "https://management.azure.com"
        );
        assert_eq!(scope_to_resource("api://custom"), "api://custom");
    }

    #[test]
    fn test_token_expiry_margin() {
        let now = Utc::now();
        let fresh = AccessToken {
            token: "t".to_string(),
            expires_on: now + Duration::hours(1),
        };
        let stale = AccessToken {
            token: "t".to_string(),
            expires_on: now + Duration::seconds(60),
        };
        assert!(!fresh.is_expiring(now));
        assert!(stale.is_expiring(now));
    }

    #[tokio::test]
    async fn test_cache_reuses_fresh_token() {
        let cache = TokenCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_fetch(MANAGEMENT_SCOPE, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(AccessToken {
                        token: "abc".to_string(),
                        expires_on: Utc::now() + Duration::hours(1),
                    })
                })
                .await
                .unwrap();
            assert_eq!(token.token, "abc");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_refreshes_expiring_token() {
        let cache = TokenCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_fetch(MANAGEMENT_SCOPE, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(AccessToken {
                        token: "short".to_string(),
                        expires_on: Utc::now() + Duration::seconds(10),
                    })
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
