//! # Deployment Gateway
//!
//! Narrow interface onto the deployment-automation backend. Every mutating call
//! starts a backend task and returns its ID; the broker never waits on a task
//! inside a request.

use crate::maintenance_info::MaintenanceInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Backend task state as reported by the deployment system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Processing,
    Done,
    Error,
    Timeout,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Processing)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Timeout | Self::Cancelled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: u64,
    pub state: TaskState,
    /// Backend's description or error text, preserved verbatim
    pub description: String,
    pub context_id: String,
}

/// Desired state handed to the backend for a deploy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    pub deployment_name: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub maintenance_info: Option<MaintenanceInfo>,
}

/// What the backend currently records about a deployed instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub maintenance_info: Option<MaintenanceInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("deployment {deployment} has a task in progress")]
    TaskInProgress { deployment: String },

    #[error("deployment system unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("deployment system returned {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("deployment system rejected the request: {reason}")]
    Rejected { reason: String },
}

impl GatewayError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Whether repeating the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TaskInProgress { .. } | Self::Unreachable { .. } | Self::Timeout { .. } => true,
            Self::ServerError { status, .. } => *status >= 500,
            Self::NotFound { .. } | Self::Rejected { .. } => false,
        }
    }
}

#[async_trait]
pub trait DeploymentGateway: Send + Sync {
    async fn submit_deploy(
        &self,
        manifest: &DeploymentManifest,
        context_id: &str,
    ) -> Result<u64, GatewayError>;

    /// Delete a deployment. A missing deployment is reported as `NotFound`.
    async fn submit_delete(&self, deployment_name: &str, context_id: &str)
        -> Result<u64, GatewayError>;

    async fn submit_errand(
        &self,
        deployment_name: &str,
        errand: &str,
        context_id: &str,
    ) -> Result<u64, GatewayError>;

    /// Recreate every VM of a deployment without changing its manifest
    async fn submit_recreate(
        &self,
        deployment_name: &str,
        context_id: &str,
    ) -> Result<u64, GatewayError>;

    async fn poll_task(&self, task_id: u64) -> Result<TaskStatus, GatewayError>;

    /// All tasks started for `deployment_name` under `context_id`, oldest first
    async fn tasks_for_context(
        &self,
        deployment_name: &str,
        context_id: &str,
    ) -> Result<Vec<TaskStatus>, GatewayError>;

    async fn deployment(
        &self,
        deployment_name: &str,
    ) -> Result<Option<DeploymentRecord>, GatewayError>;

    /// The oldest queued or processing task on `deployment_name`, if any
    async fn active_task(&self, deployment_name: &str) -> Result<Option<TaskStatus>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Unreachable {
            reason: "dns".to_string()
        }
        .is_transient());
        assert!(GatewayError::TaskInProgress {
            deployment: "d".to_string()
        }
        .is_transient());
        assert!(GatewayError::ServerError {
            status: 503,
            message: "busy".to_string()
        }
        .is_transient());
        assert!(!GatewayError::ServerError {
            status: 422,
            message: "bad manifest".to_string()
        }
        .is_transient());
        assert!(!GatewayError::not_found("deployment d").is_transient());
        assert!(!GatewayError::Rejected {
            reason: "invalid".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_task_state_terminality() {
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Processing.is_terminal());
        assert!(TaskState::Done.is_terminal());
        assert!(!TaskState::Done.is_failure());
        assert!(TaskState::Cancelled.is_failure());
    }
}
