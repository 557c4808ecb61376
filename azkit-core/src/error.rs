use reqwest::StatusCode;
use thiserror::Error;

/// A required field was empty when a request was about to be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} must not be empty")]
pub struct ValidationError {
    pub field: &'static str,
}

impl ValidationError {
    pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError { field });
        }
        Ok(())
    }
}

/// Non-success response from an Azure REST endpoint.
#[derive(Error, Debug)]
#[error("{operation} failed with {status}: {body}")]
pub struct ServiceError {
    pub operation: &'static str,
    pub status: StatusCode,
    pub body: String,
}

impl ServiceError {
    /// Consumes a response, returning it untouched on success and a
    /// `ServiceError` carrying the body otherwise.
    pub async fn check(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(operation, ?status, %body, "azure request failed");
        Err(ServiceError {
            operation,
            status,
            body,
        })
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}
