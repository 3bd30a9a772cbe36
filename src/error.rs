//! # Broker Errors
//!
//! Error taxonomy for the broker orchestration layer.
//!
//! - [`ClientError`]: the request itself is malformed or inconsistent. Never retried;
//!   surfaced to the requester with a machine-readable reason code.
//! - [`GatewayError`]: the deployment backend was unreachable or rejected a submission.
//!   Surfaced immediately, never retried inside the broker.
//! - [`CredentialStoreError`]: the secret store failed while persisting binding credentials.
//!
//! Fleet-level failures live in [`crate::fleet::FleetError`], since they only exist for
//! bulk rollouts.

use crate::gateway::{CredentialStoreError, GatewayError};
use crate::operation::TokenError;
use thiserror::Error;

/// Requests the broker refuses before any deployment action is taken
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("plan {plan_id} does not exist in the broker catalog")]
    PlanNotFound { plan_id: String },

    #[error("maintenance_info was passed, but the broker catalog contains no maintenance_info for plan {plan_id}")]
    MaintenanceInfoNilConflict { plan_id: String },

    #[error("passed maintenance_info does not match the catalog maintenance_info for plan {plan_id}")]
    MaintenanceInfoConflict { plan_id: String },

    #[error("maintenance_info does not match the maintenance_info of target plan {plan_id}")]
    PlanMismatch { plan_id: String },

    #[error("this service plan requires client support for asynchronous service operations")]
    AsyncRequired,

    #[error("service instance {instance_id} already exists")]
    InstanceAlreadyExists { instance_id: String },

    #[error("service instance {instance_id} not found")]
    InstanceNotFound { instance_id: String },

    #[error("binding {binding_id} not found for service instance {instance_id}")]
    BindingNotFound {
        instance_id: String,
        binding_id: String,
    },

    #[error("an operation is already in progress for service instance {instance_id}")]
    OperationInProgress { instance_id: String },

    #[error("invalid operation token: {reason}")]
    InvalidOperationToken { reason: String },
}

impl ClientError {
    /// Stable, machine-readable reason code returned to the marketplace
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::PlanNotFound { .. } => "PlanNotFound",
            Self::MaintenanceInfoNilConflict { .. } => "MaintenanceInfoNilConflict",
            Self::MaintenanceInfoConflict { .. } => "MaintenanceInfoConflict",
            Self::PlanMismatch { .. } => "PlanMismatch",
            Self::AsyncRequired => "AsyncRequired",
            Self::InstanceAlreadyExists { .. } => "InstanceAlreadyExists",
            Self::InstanceNotFound { .. } => "InstanceNotFound",
            Self::BindingNotFound { .. } => "BindingNotFound",
            Self::OperationInProgress { .. } => "ConcurrencyError",
            Self::InvalidOperationToken { .. } => "InvalidOperationToken",
        }
    }

    /// HTTP-equivalent status for the marketplace response
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MaintenanceInfoNilConflict { .. }
            | Self::MaintenanceInfoConflict { .. }
            | Self::PlanMismatch { .. }
            | Self::AsyncRequired => 422,
            Self::InstanceAlreadyExists { .. } | Self::OperationInProgress { .. } => 409,
            Self::InstanceNotFound { .. } => 404,
            Self::BindingNotFound { .. } => 410,
            Self::PlanNotFound { .. } | Self::InvalidOperationToken { .. } => 400,
        }
    }
}

/// Top-level error returned by every broker operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Deployment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Credential store error: {0}")]
    CredentialStore(#[from] CredentialStoreError),
}

impl BrokerError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Reason code for client errors, `None` for backend failures
    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Client(err) => Some(err.reason_code()),
            _ => None,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Client(err) => err.status_code(),
            Self::Gateway(_) | Self::CredentialStore(_) => 500,
        }
    }
}

impl From<TokenError> for BrokerError {
    fn from(err: TokenError) -> Self {
        BrokerError::Client(ClientError::InvalidOperationToken {
            reason: err.to_string(),
        })
    }
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
