//! Request and response types of the marketplace lifecycle contract.

use crate::maintenance_info::MaintenanceInfo;
use crate::operation::{OperationToken, TokenError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub maintenance_info: Option<MaintenanceInfo>,
    #[serde(default)]
    pub accepts_incomplete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,
    /// Plan the instance was on before this request, as reported by the marketplace
    #[serde(default)]
    pub previous_plan_id: Option<String>,
    /// Null keeps the parameters currently deployed
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub maintenance_info: Option<MaintenanceInfo>,
    #[serde(default)]
    pub accepts_incomplete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprovisionRequest {
    pub instance_id: String,
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub accepts_incomplete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindRequest {
    pub instance_id: String,
    pub binding_id: String,
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbindRequest {
    pub instance_id: String,
    pub binding_id: String,
    pub service_id: String,
    pub plan_id: String,
}

/// An asynchronous operation the broker accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationAccepted {
    pub token: OperationToken,
    /// Advisories for the requester that did not fail the request
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl OperationAccepted {
    pub fn new(token: OperationToken) -> Self {
        Self {
            token,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Opaque string the marketplace echoes back on LastOperation polls
    pub fn operation_data(&self) -> Result<String, TokenError> {
        self.token.encode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeprovisionResponse {
    /// A delete task was started
    Accepted(OperationToken),
    /// Nothing left to delete
    Completed,
}

impl DeprovisionResponse {
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindResponse {
    pub credentials: Value,
}

/// Result of a management-surface trigger for one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOutcome {
    /// Backend work started; poll the token to completion
    Accepted(OperationToken),
    /// The deployment already runs the plan's declared revision
    AlreadyCurrent,
    /// The deployment no longer exists
    InstanceGone,
}
