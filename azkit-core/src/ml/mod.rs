//! Azure Machine Learning command job submission

pub mod client;
pub mod code;
pub mod job;
pub mod types;

pub use client::{MlClient, SubmittedJob};
pub use job::{command, CommandJob, JobBuilder};

use crate::error::ValidationError;

/// Identifies one workspace: subscription, resource group and workspace name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceScope {
    subscription_id: String,
    resource_group: String,
    workspace_name: String,
}

impl WorkspaceScope {
    pub fn new(
        subscription_id: String,
        resource_group: String,
        workspace_name: String,
    ) -> Result<Self, ValidationError> {
        ValidationError::require("subscription_id", &subscription_id)?;
        ValidationError::require("resource_group", &resource_group)?;
        ValidationError::require("workspace_name", &workspace_name)?;
        Ok(Self {
            subscription_id,
            resource_group,
            workspace_name,
        })
    }

    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    pub fn workspace_id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.subscription_id, self.resource_group, self.workspace_name
        )
    }

    /// ARM id of a versioned workspace asset such as a code or environment
    pub fn asset_id(&self, kind: &str, name: &str, version: &str) -> String {
        format!("{}/{kind}/{name}/versions/{version}", self.workspace_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_layout() {
        let scope =
            WorkspaceScope::new("sub".to_string(), "rg".to_string(), "ws".to_string()).unwrap();
        assert_eq!(
            scope.asset_id("environments", "sklearn", "3"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/ws/environments/sklearn/versions/3"
        );
    }

    #[test]
    fn test_scope_rejects_blank_subscription() {
        let err =
            WorkspaceScope::new("".to_string(), "rg".to_string(), "ws".to_string()).unwrap_err();
        assert_eq!(err.field, "subscription_id");
    }
}
